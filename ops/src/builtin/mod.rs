//! Operators compiled into every registry.

pub mod load_save;
pub mod sparse_to_dense;

pub use load_save::{LoadOp, SaveOp};
pub use sparse_to_dense::SparseToDenseOp;

use tracing::warn;

use crate::op::Op;
use crate::types::{GradientKind, RegistrationInfo};
use crate::OpRegistry;

/// Make sure the builtins are present after an inventory scan; submissions
/// from object files nothing references may be dropped at link time.
pub(crate) fn install(reg: &mut OpRegistry) {
    install_op::<SparseToDenseOp>(reg);
    install_op::<SaveOp>(reg);
    install_op::<LoadOp>(reg);
}

fn install_op<O: RegistrationInfo + Op + 'static>(reg: &mut OpRegistry) {
    if !reg.contains(O::NAME) {
        if let Err(error) = reg.register::<O>() {
            warn!(%error, "skipping builtin operator");
        }
    }
    if reg.gradient(O::NAME).is_none() {
        reg.declare_gradient(O::NAME, GradientKind::NoGradient);
    }
}
