/// Row-major strides and element count for a dense tensor of the given shape.
///
/// `None` when a partial product of the extents overflows `usize`.
pub fn compute_strides(shape: &[usize]) -> Option<(Vec<usize>, usize)> {
    let mut strides = vec![1; shape.len()];
    let mut acc: usize = 1;
    for (stride, &extent) in strides.iter_mut().zip(shape).rev() {
        *stride = acc;
        acc = acc.checked_mul(extent)?;
    }
    Some((strides, acc))
}
