use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use ptc_core::config::{Config, get_config_path};

const BANNER: &str = r"
    -------------------------------------

     ____  _____  ____
    |  _ \|_   _|/ ___|
    | |_) | | | | |
    |  __/  | | | |___
    |_|     |_|  \____|

    programmatic tool calling
    -------------------------------------
";

const MODELS: &[&str] = &["claude-opus-4-6", "claude-sonnet-4-5", "claude-haiku-4-5"];

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn setup_api_key() -> Result<String> {
    let api_key: String = Input::new()
        .with_prompt("Enter your Anthropic API key (leave empty to use ANTHROPIC_API_KEY)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read API key")?;

    Ok(api_key.trim().to_string())
}

fn setup_model() -> Result<String> {
    let selection = Select::new()
        .with_prompt("Select your model")
        .items(MODELS)
        .default(0)
        .interact()
        .context("Failed to select model")?;

    Ok(MODELS[selection].to_string())
}

fn setup_max_tokens() -> Result<u32> {
    Input::new()
        .with_prompt("Maximum output tokens per turn")
        .default(4096u32)
        .interact_text()
        .context("Failed to read max tokens")
}

/// Settings the wizard does not ask about are carried over from the existing file.
fn apply_answers(existing: Config, api_key: String, model: String, max_tokens: u32) -> Config {
    Config {
        api_key,
        model,
        max_tokens,
        ..existing
    }
}

pub fn run_onboard() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());
    println!(
        "  {}",
        style("This wizard writes the client configuration.").dim()
    );

    print_step(1, 3, "API Key Setup");
    let api_key = setup_api_key()?;

    print_step(2, 3, "Model Selection");
    let model = setup_model()?;

    print_step(3, 3, "Output Budget");
    let max_tokens = setup_max_tokens()?;

    let config = apply_answers(Config::load_or_init()?, api_key, model, max_tokens);

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(get_config_path().display()).cyan()
    );
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("ptc demo basic").cyan().bold()
    );
    println!();

    Ok(config)
}
