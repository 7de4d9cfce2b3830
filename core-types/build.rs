use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize)]
struct TypeInfo {
    name: String,
    rust: String,
    label: String,
    #[serde(default)]
    float: bool,
    #[serde(default)]
    index: bool,
}

#[derive(Debug, Deserialize, Serialize)]
struct TypeList {
    types: Vec<TypeInfo>,
}

fn main() {
    let yaml_path = Path::new("../supported_types.yaml");
    let yaml_str = fs::read_to_string(yaml_path)
        .expect("Unable to read supported_types.yaml");
    let type_list: TypeList = serde_yaml::from_str(&yaml_str)
        .expect("Failed to parse supported_types.yaml");

    let template_path = Path::new("templates/data_types.jinja");
    let template_source = fs::read_to_string(template_path)
        .expect("Unable to read template file");

    let env = Environment::new();
    let tmpl = env
        .template_from_str(&template_source)
        .expect("Invalid data_types template");
    let rendered = tmpl
        .render(context! { types => type_list.types })
        .expect("Failed to render data_types template");

    // Only touch the file when the content changes so cargo does not rebuild in a loop
    let out_path = Path::new("src/generated_data_types.rs");
    if fs::read_to_string(out_path).ok().as_deref() != Some(rendered.as_str()) {
        fs::write(out_path, rendered).expect("Unable to write generated file");
    }

    println!("cargo:rerun-if-changed=../supported_types.yaml");
    println!("cargo:rerun-if-changed=templates/data_types.jinja");
}
