//! Interactive chat application for the DeepSeek chat completions API.
//!
//! This binary provides a streaming REPL around [`ChatController`]: each line typed is one turn,
//! conversations are capped at a fixed number of messages, and `/reset` starts over.
//!
//! # Usage
//!
//! ```bash
//! # Paraphrasing feedback assistant, key from the environment
//! DEEPSEEK_API_KEY=sk-... seekchat
//!
//! # Key from a YAML secrets file
//! seekchat --secrets secrets.yaml
//!
//! # A plain chat without the system instruction or opening task
//! seekchat --no-system --no-seed
//!
//! # Disable colors (useful for piping output)
//! seekchat --no-color
//!
//! # Append metric readings on /stats and at exit
//! seekchat --metrics-file seekchat.metrics
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/reset` - Start the conversation over
//! - `/history` - Show the conversation so far
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;

use arrrg::CommandLine;
use biometrics::Collector;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use seekchat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatController, ChatInput, ControllerState,
    LIMIT_REACHED_NOTICE, LimitNotice, PlainTextRenderer, Renderer, Session, TurnOutcome,
    help_text, load_api_key, parse_input,
};
use seekchat::{DeepSeek, JsonLinesLogger, emit_biometrics, register_biometrics};

/// Main entry point for the seekchat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("seekchat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;
    let use_color = config.use_color;

    let api_key = match load_api_key(config.secrets_path.as_deref()) {
        Ok(key) => key,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    let mut client = DeepSeek::with_options(Some(api_key), config.base_url.clone(), config.timeout)?;
    if let Some(path) = &config.log_file {
        client = client.with_logger(Arc::new(JsonLinesLogger::open(path)?));
    }
    let metrics = config.metrics_file.clone().map(|path| {
        let collector = Collector::new();
        register_biometrics(&collector);
        (collector, path)
    });

    let controller = ChatController::new(client, config);
    let mut session = controller.new_session();
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    print_banner(controller.config(), &session);
    controller.render_history(&mut session, &mut renderer);

    let mut announced_full = false;
    loop {
        match controller.limit_notice(&session) {
            Some(notice @ LimitNotice::ExchangesLeft(_)) => {
                renderer.print_warning(&notice.message());
                announced_full = false;
            }
            Some(notice @ LimitNotice::CapReached { .. }) => {
                if !announced_full {
                    renderer.print_error(&notice.message());
                    renderer.print_info(LIMIT_REACHED_NOTICE);
                    announced_full = true;
                }
            }
            None => announced_full = false,
        }

        let prompt = match controller.state(&session) {
            ControllerState::AwaitingInput => "You: ",
            ControllerState::Full => "(/reset to continue) ",
        };
        let readline = rl.readline(prompt);

        match readline {
            Ok(line) => {
                let Some(input) = parse_input(&line) else {
                    continue;
                };

                let _ = rl.add_history_entry(line.trim());

                let command = match input {
                    ChatInput::Command(command) => command,
                    ChatInput::Message(text) => {
                        // Regular message - one turn against the API
                        let outcome = controller.submit(&mut session, text, &mut renderer).await;
                        if matches!(outcome, TurnOutcome::Rejected) {
                            announced_full = true;
                        }
                        continue;
                    }
                };
                match command {
                    ChatCommand::Quit => {
                        println!("Goodbye!");
                        break;
                    }
                    ChatCommand::Reset => {
                        controller.reset(&mut session, &mut renderer);
                        announced_full = false;
                        controller.render_history(&mut session, &mut renderer);
                    }
                    ChatCommand::History => {
                        controller.render_history(&mut session, &mut renderer);
                    }
                    ChatCommand::Help => {
                        for line in help_text().lines() {
                            println!("    {line}");
                        }
                    }
                    ChatCommand::Stats => {
                        print_stats(&controller, &session);
                        if let Some((collector, path)) = &metrics {
                            match emit_biometrics(collector, path) {
                                Ok(()) => println!("      Metrics written to {}", path.display()),
                                Err(err) => renderer.print_error(&err.to_string()),
                            }
                        }
                    }
                    ChatCommand::ShowConfig => {
                        print_config(controller.config());
                    }
                    ChatCommand::Invalid(message) => {
                        renderer.print_error(&message);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    if let Some((collector, path)) = &metrics {
        emit_biometrics(collector, path)?;
    }

    Ok(())
}

fn print_banner(config: &ChatConfig, session: &Session) {
    if config.system_prompt.is_some() && config.seed_message.is_some() {
        println!("Paraphrasing Feedback Assistant (model: {})", config.model);
        println!(
            "This chatbot helps with paraphrasing tasks and provides constructive feedback to improve your writing."
        );
    } else {
        println!("DeepSeek Chat (model: {})", config.model);
    }
    println!(
        "The conversation is limited to {} messages ({} exchanges), with each response limited to {} words.",
        config.message_cap,
        config.message_cap / 2,
        config.word_limit
    );
    println!("Type /help for commands, /quit to exit ({})\n", session.id());
}

fn print_stats<C: seekchat::ChatCompletions>(controller: &ChatController<C>, session: &Session) {
    let stats = session.stats();
    println!("    Session Statistics ({}):", session.id());
    println!(
        "      Messages: {}/{}",
        session.count(),
        controller.config().message_cap
    );
    println!("      Exchanges left: {}", controller.exchanges_left(session));
    println!("      Turns sent: {}", stats.turns);
    println!("      Rejected submissions: {}", stats.rejected);
    println!(
        "      Truncations: {} user / {} reply",
        stats.user_truncations, stats.reply_truncations
    );
    println!("      Apologies: {}", stats.apologies);
    println!("      Resets: {}", stats.resets);
}

fn print_config(config: &ChatConfig) {
    println!("    Current Configuration:");
    println!("      Model: {}", config.model);
    println!("      Max tokens: {}", describe(config.max_tokens));
    println!("      Temperature: {}", describe_float(config.temperature));
    println!("      Message cap: {}", config.message_cap);
    println!("      Word limit: {}", config.word_limit);
    println!(
        "      System instruction: {}",
        if config.system_prompt.is_some() {
            "set"
        } else {
            "(none)"
        }
    );
    println!(
        "      Opening message: {}",
        if config.seed_message.is_some() {
            "set"
        } else {
            "(none)"
        }
    );
    match config.timeout {
        Some(timeout) => println!("      Timeout: {}s", timeout.as_secs()),
        None => println!("      Timeout: (none)"),
    }
    match config.log_file {
        Some(ref path) => println!("      Log file: {}", path.display()),
        None => println!("      Log file: (disabled)"),
    }
    match config.metrics_file {
        Some(ref path) => println!("      Metrics file: {}", path.display()),
        None => println!("      Metrics file: (disabled)"),
    }
}

fn describe(value: Option<u32>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "default".to_string())
}

fn describe_float(value: Option<f32>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "default".to_string())
}
