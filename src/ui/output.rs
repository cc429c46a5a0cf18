use super::highlight::boxed;
use crate::config::Starter;
use crate::models::Artifact;
use colored::*;

/// Display a finished tool step: its input and, for hosted search, the results.
pub fn display_tool_step(name: &str, input: &str, output: &str) {
    let mut body = format!("// input\n{}\n", input.trim_end());
    if !output.is_empty() {
        body.push_str(&format!("// output\n{}\n", output.trim_end()));
    }
    print!("{}", boxed(&format!("TOOL: {}", name), &body, Some("json")));
}

/// Display a turn or tool error in a boxed format
pub fn display_error(error: &str) {
    print!("{}", boxed("ERROR", error, None));
}

/// Show a generated component the way a preview pane would: name, source, props.
pub fn display_artifact(artifact: &Artifact) {
    println!("{} {}", "Component:".green().bold(), artifact.name.bold());
    print!("{}", boxed("jsx", &artifact.source_code, Some("jsx")));

    let props = serde_json::to_string_pretty(&artifact.props)
        .unwrap_or_else(|_| artifact.props.to_string());
    print!("{}", boxed("props", &props, Some("json")));
}

pub fn display_notice(notice: &str) {
    println!("{}", notice.yellow());
}

pub fn display_starters(starters: &[Starter]) {
    if starters.is_empty() {
        return;
    }
    println!("{}", "Try asking:".dimmed());
    for (index, starter) in starters.iter().enumerate() {
        println!(
            "  {} {} {}",
            format!("[{}]", index + 1).cyan(),
            starter.label.bold(),
            format!("- {}", starter.message).dimmed()
        );
    }
}
