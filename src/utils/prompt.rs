//! User prompt utilities for interactive confirmation

use anyhow::Result;
use dialoguer::Confirm;

/// Ask for a yes/no confirmation, defaulting to no
pub fn confirm(prompt: &str) -> Result<bool> {
    let result = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_prompt_module_exists() {
        // Actual prompts can't be exercised without a terminal
    }
}
