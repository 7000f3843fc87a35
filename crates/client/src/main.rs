//! Terminal front end of FitchatAI.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use clap::Parser;
use fitchat_client::{
    APOLOGY_MESSAGE, ChatSessionBuilder, GREETING, HttpTransport, InputBuffer,
    TurnOutcome,
};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Chat about health and wellbeing with FitchatAI.
///
/// End a line with a backslash to continue the message on the next line.
#[derive(Debug, Parser)]
#[command(name = "fitchat")]
struct Args {
    /// Base URL of the FitchatAI server.
    #[arg(long, env = "FITCHAT_URL", default_value = "http://127.0.0.1:3000")]
    url: String,
}

enum SessionEvent {
    Fragment(String),
    TurnEnded(TurnOutcome),
}

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let session =
        ChatSessionBuilder::with_transport(HttpTransport::new(&args.url))
            .on_fragment({
                let event_tx = event_tx.clone();
                move |text| {
                    event_tx.send(SessionEvent::Fragment(text.to_owned())).ok();
                }
            })
            .on_turn_end({
                let event_tx = event_tx.clone();
                move |outcome| {
                    event_tx.send(SessionEvent::TurnEnded(outcome)).ok();
                }
            })
            .build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    print_assistant_bar();
    println!("{}", GREETING.bright_white());

    let mut stdin = io::BufReader::new(io::stdin()).lines();
    let mut input = InputBuffer::default();
    'outer: loop {
        print!("{} ", if input.is_composing() { "." } else { ">" });
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };
        let Some(message) = input.push_line(&line) else {
            continue;
        };
        if message.trim().is_empty() {
            continue;
        }
        session.submit(message);
        let mut printed = String::new();

        let mut progress_bar = Some(ProgressBar::new_spinner());
        if let Some(progress_bar) = &progress_bar {
            progress_bar.set_style(progress_style.clone());
            progress_bar.set_message("Thinking...");
        }

        loop {
            if let Some(progress_bar) = &progress_bar {
                progress_bar.inc(1);
            }

            let sleep = sleep(Duration::from_millis(100));
            let event = select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        break 'outer;
                    };
                    event
                },
                _ = sleep => {
                    continue;
                }
            };

            // The spinner only runs until the reply starts.
            if let Some(progress_bar) = progress_bar.take() {
                progress_bar.finish_and_clear();
                print_assistant_bar();
            }

            match event {
                SessionEvent::Fragment(text) => {
                    printed.push_str(&text);
                    print!("{}", text.bright_white());
                    std::io::stdout().flush().ok();
                }
                SessionEvent::TurnEnded(TurnOutcome::Completed) => {
                    println!();
                    break;
                }
                SessionEvent::TurnEnded(TurnOutcome::Failed) => {
                    // The partial reply was discarded by the session.
                    print!("{}", erase_reply(&printed));
                    print_assistant_bar();
                    println!("{}", APOLOGY_MESSAGE.bright_red());
                    break;
                }
            }
        }
    }

    session.close();
}

/// Returns the escape sequence that moves the cursor back to the start of
/// the reply and clears everything below it.
fn erase_reply(printed: &str) -> String {
    let lines = printed.matches('\n').count();
    if lines == 0 {
        "\r\x1b[J".to_owned()
    } else {
        format!("\r\x1b[{lines}A\x1b[J")
    }
}

fn print_assistant_bar() {
    print!("{}🤖 ", BAR_CHAR.bright_cyan());
}

async fn read_line(
    stdin: &mut io::Lines<io::BufReader<io::Stdin>>,
) -> Option<String> {
    match stdin.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
