use tox_oop_ir::{convert_json, PipelineConfig};

fn main() {
    let declarations = r#"{
        "headers": [{
            "file": "tox.h",
            "structs": ["Tox"],
            "functions": [
                { "name": "tox_new", "return_type": { "name": "Tox", "pointer": true } },
                {
                    "name": "tox_kill",
                    "return_type": { "name": "void" },
                    "params": [{ "name": "tox", "type": { "name": "Tox", "pointer": true } }]
                },
                {
                    "name": "tox_iteration_interval",
                    "return_type": { "name": "uint32_t" },
                    "params": [
                        { "name": "tox", "type": { "name": "Tox", "pointer": true, "const": true } }
                    ]
                }
            ]
        }]
    }"#;

    match convert_json(declarations, &PipelineConfig::default()) {
        Ok(result) => {
            let json_output = result.to_json().unwrap();
            println!("Converted declarations to the IR document:\n{json_output}");
        }
        Err(e) => {
            eprintln!("Failed to convert declarations: {:?}", miette::Report::new(e));
        }
    }
}
