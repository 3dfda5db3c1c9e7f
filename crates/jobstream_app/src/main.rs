//! Console front end for the jobstream controller: submits one job over the
//! chosen transport and streams its progress log to stdout.
mod runner;

use std::process::ExitCode;
use std::time::{Duration, Instant};

use bytes::Bytes;
use jobstream_core::{update, JobConfig, JobPhase, JobState, Msg, SentinelSet, StallPolicy};
use jobstream_transport::{JobSpec, UploadSource};
use runner::EffectRunner;
use stream_logging::{set_poll_tick, stream_error};

/// Poll cadence; matches the 250ms interval the job pages always used.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Long-poll runs give up after this many unit-less poll ticks (60s).
const STALL_TICK_LIMIT: u32 = 240;

const USAGE: &str = "usage:
  jobstream_app long-poll <url> [key=value ...]
  jobstream_app websocket <url>
  jobstream_app upload <url> <file> [content-type]

options (before the mode):
  --done <sentinel>   completion sentinel (default: DONE)
  --err <sentinel>    failure sentinel (default: ERR)";

struct Invocation {
    config: JobConfig,
    spec: JobSpec,
}

fn main() -> ExitCode {
    stream_logging::initialize_terminal(log::LevelFilter::Info);

    let invocation = match parse_args(std::env::args().skip(1).collect()) {
        Ok(invocation) => invocation,
        Err(message) => {
            eprintln!("{message}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    run(invocation)
}

fn run(invocation: Invocation) -> ExitCode {
    let mut state = JobState::new(invocation.config);
    let effect_runner = EffectRunner::new(invocation.spec);
    let mut printed = 0usize;
    let mut tick = 0u64;
    let mut next_poll = Instant::now() + POLL_INTERVAL;

    // The CLI invocation is the user's submission click.
    let (next, effects) = update(state, Msg::SubmitClicked);
    state = next;
    effect_runner.run_effects(effects);

    loop {
        while let Some(msg) = effect_runner.try_recv_msg() {
            let (next, effects) = update(state, msg);
            state = next;
            effect_runner.run_effects(effects);
        }

        if Instant::now() >= next_poll {
            next_poll += POLL_INTERVAL;
            tick += 1;
            set_poll_tick(tick);
            let (next, effects) = update(state, Msg::PollTick);
            state = next;
            effect_runner.run_effects(effects);
        }

        if state.consume_dirty() {
            let view = state.view();
            // Append-only rendering: only lines not shown yet.
            for line in &view.log[printed..] {
                println!("{line}");
            }
            printed = view.log.len();
            if let Some(percent) = view.upload_percent {
                println!("uploaded {percent}%");
            }
        }

        match state.phase() {
            JobPhase::Completed => {
                println!("job finished: {}", describe_result(&state));
                return ExitCode::SUCCESS;
            }
            JobPhase::Failed => {
                stream_error!("job failed: {}", describe_result(&state));
                return ExitCode::FAILURE;
            }
            JobPhase::Idle | JobPhase::Running => {}
        }

        std::thread::sleep(Duration::from_millis(25));
    }
}

fn describe_result(state: &JobState) -> String {
    state
        .view()
        .result
        .map(|result| result.to_string())
        .unwrap_or_else(|| "no result".to_string())
}

fn parse_args(mut args: Vec<String>) -> Result<Invocation, String> {
    let mut done = "DONE".to_string();
    let mut err = "ERR".to_string();

    while args.first().is_some_and(|arg| arg.starts_with("--")) {
        let flag = args.remove(0);
        if args.is_empty() {
            return Err(format!("{flag} needs a value"));
        }
        let value = args.remove(0);
        match flag.as_str() {
            "--done" => done = value,
            "--err" => err = value,
            other => return Err(format!("unknown option {other}")),
        }
    }

    let mode = args.first().cloned().ok_or("missing mode")?;
    let sentinels = SentinelSet::new(done.clone(), err.clone());
    match mode.as_str() {
        "long-poll" => {
            let url = args.get(1).cloned().ok_or("long-poll needs a url")?;
            let form = args[2..]
                .iter()
                .map(|pair| match pair.split_once('=') {
                    Some((key, value)) => Ok((key.to_string(), value.to_string())),
                    None => Err(format!("form field '{pair}' is not key=value")),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Invocation {
                config: JobConfig::long_poll("</message>", sentinels)
                    .with_stall_policy(StallPolicy::FailAfterTicks(STALL_TICK_LIMIT)),
                spec: JobSpec::LongPoll { url, form },
            })
        }
        "websocket" => {
            let url = args.get(1).cloned().ok_or("websocket needs a url")?;
            Ok(Invocation {
                config: JobConfig::web_socket(sentinels),
                spec: JobSpec::WebSocket {
                    url,
                    done,
                    error: err,
                },
            })
        }
        "upload" => {
            let url = args.get(1).cloned().ok_or("upload needs a url")?;
            let file = args.get(2).cloned().ok_or("upload needs a file")?;
            let content_type = args
                .get(3)
                .cloned()
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let bytes = std::fs::read(&file)
                .map(Bytes::from)
                .map_err(|io_err| format!("cannot read {file}: {io_err}"))?;
            Ok(Invocation {
                config: JobConfig::upload(),
                spec: JobSpec::Upload {
                    url,
                    source: UploadSource {
                        bytes,
                        content_type,
                    },
                },
            })
        }
        other => Err(format!("unknown mode {other}")),
    }
}
