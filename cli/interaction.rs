use anyhow::Result;
use console::style;
use dialoguer::Confirm;

pub fn confirm_processing(rule_count: usize, file_count: usize, no_confirm: bool) -> Result<bool> {
    if no_confirm || file_count == 0 {
        return Ok(true);
    }

    let prompt = format!(
        "Run {} {} on {} {}?",
        style(rule_count).cyan(),
        if rule_count == 1 { "rule" } else { "rules" },
        style(file_count).cyan(),
        if file_count == 1 { "file" } else { "files" }
    );

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    if !confirmed {
        println!("Aborted by user.");
    }

    Ok(confirmed)
}
