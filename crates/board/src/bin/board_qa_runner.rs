use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use chainboard::avatar::{AvatarCache, Identicon};
use chainboard::feed::FeedView;
use chainboard::settings::{BoardSettings, NetworkSettings, SettingsError, SettingsStore};
use chainboard::submission::{SubmissionStatus, SubmitOutcome};
use chainboard::{MessageBoard, NotificationLog, Severity};
use chainboard_gateway::{
    Address, GatewayError, MemoryChain, MemoryWallet, ReceiptMode, RejectionDetails,
};
use serde_json::json;
use snafu::{OptionExt, ResultExt, Snafu};
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct RunnerArgs {
    scenario: Scenario,
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
enum Scenario {
    FeedWindow,
    EmptyBoard,
    MalformedRows,
    PostConfirmed,
    PostRejected,
    PostDisconnected,
    AvatarEviction,
    ConfiguredBoard,
    SettingsSave,
    All,
}

impl Scenario {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "feed_window" => Some(Self::FeedWindow),
            "empty_board" => Some(Self::EmptyBoard),
            "malformed_rows" => Some(Self::MalformedRows),
            "post_confirmed" => Some(Self::PostConfirmed),
            "post_rejected" => Some(Self::PostRejected),
            "post_disconnected" => Some(Self::PostDisconnected),
            "avatar_eviction" => Some(Self::AvatarEviction),
            "configured_board" => Some(Self::ConfiguredBoard),
            "settings_save" => Some(Self::SettingsSave),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::FeedWindow => "feed_window",
            Self::EmptyBoard => "empty_board",
            Self::MalformedRows => "malformed_rows",
            Self::PostConfirmed => "post_confirmed",
            Self::PostRejected => "post_rejected",
            Self::PostDisconnected => "post_disconnected",
            Self::AvatarEviction => "avatar_eviction",
            Self::ConfiguredBoard => "configured_board",
            Self::SettingsSave => "settings_save",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Snafu)]
enum RunnerError {
    #[snafu(display("missing required --scenario argument"))]
    MissingScenario { stage: &'static str },
    #[snafu(display("missing value for argument '{arg}'"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },
    #[snafu(display("unknown scenario '{raw}'"))]
    UnknownScenario { stage: &'static str, raw: String },
    #[snafu(display("unknown argument '{raw}'"))]
    UnknownArgument { stage: &'static str, raw: String },
    #[snafu(display("gateway call failed: {source}"))]
    Gateway {
        stage: &'static str,
        source: GatewayError,
    },
    #[snafu(display("settings could not be saved: {source}"))]
    Settings {
        stage: &'static str,
        source: SettingsError,
    },
    #[snafu(display("missing required --config argument for scenario '{scenario}'"))]
    MissingConfigPath {
        stage: &'static str,
        scenario: &'static str,
    },
    #[snafu(display("scenario '{scenario}' failed: {reason}"))]
    ScenarioFailed {
        stage: &'static str,
        scenario: &'static str,
        reason: String,
    },
}

type RunnerResult<T> = Result<T, RunnerError>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run().await {
        println!("runner_ok=false");
        eprintln!("runner_error={error}");
        std::process::exit(1);
    }
}

async fn run() -> RunnerResult<()> {
    let args = parse_args(env::args().skip(1))?;
    println!("scenario={}", args.scenario.name());

    match args.scenario {
        Scenario::FeedWindow => run_feed_window().await,
        Scenario::EmptyBoard => run_empty_board().await,
        Scenario::MalformedRows => run_malformed_rows().await,
        Scenario::PostConfirmed => run_post_confirmed().await,
        Scenario::PostRejected => run_post_rejected().await,
        Scenario::PostDisconnected => run_post_disconnected().await,
        Scenario::AvatarEviction => run_avatar_eviction(),
        Scenario::ConfiguredBoard => run_configured_board(args.config_path).await,
        Scenario::SettingsSave => run_settings_save(args.config_path),
        Scenario::All => run_all(args.config_path).await,
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> RunnerResult<RunnerArgs> {
    let mut scenario = None;
    let mut config_path = None;
    let mut pending = args.into_iter();

    while let Some(argument) = pending.next() {
        match argument.as_str() {
            "--scenario" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-scenario-value",
                    arg: "--scenario",
                })?;

                let parsed = Scenario::parse(&value).context(UnknownScenarioSnafu {
                    stage: "parse-args-scenario",
                    raw: value,
                })?;
                scenario = Some(parsed);
            }
            "--config" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-config-value",
                    arg: "--config",
                })?;
                config_path = Some(PathBuf::from(value));
            }
            _ => {
                return UnknownArgumentSnafu {
                    stage: "parse-args",
                    raw: argument,
                }
                .fail();
            }
        }
    }

    Ok(RunnerArgs {
        scenario: scenario.context(MissingScenarioSnafu {
            stage: "parse-args-scenario-required",
        })?,
        config_path,
    })
}

fn account(seed: u8) -> Address {
    Address::new([seed; 20])
}

struct Fixture {
    chain: Arc<MemoryChain>,
    log: Arc<NotificationLog>,
    board: MessageBoard,
}

fn fixture(settings: &BoardSettings, wallet: MemoryWallet, mode: ReceiptMode) -> Fixture {
    let wallet = Arc::new(wallet);
    let chain = Arc::new(MemoryChain::new(wallet.clone()).with_receipt_mode(mode));
    let log = Arc::new(NotificationLog::default());
    let board = MessageBoard::from_settings(chain.clone(), wallet, log.clone(), settings);
    Fixture { chain, log, board }
}

fn open_store(config_path: Option<PathBuf>) -> SettingsStore {
    config_path.map_or_else(SettingsStore::open_default, SettingsStore::open)
}

fn check(
    condition: bool,
    stage: &'static str,
    scenario: &'static str,
    reason: impl FnOnce() -> String,
) -> RunnerResult<()> {
    if condition {
        return Ok(());
    }
    ScenarioFailedSnafu {
        stage,
        scenario,
        reason: reason(),
    }
    .fail()
}

async fn run_feed_window() -> RunnerResult<()> {
    let mut fx = fixture(
        &BoardSettings::default(),
        MemoryWallet::connected(account(0xa1)),
        ReceiptMode::Immediate,
    );
    fx.chain
        .seed_messages(account(0xb0), (0..120).map(|index| format!("message {index}")));

    let window = fx.board.refresh().await.context(GatewaySnafu {
        stage: "scenario-feed-window-refresh",
    })?;
    println!("window_start={}", window.start);
    println!("window_length={}", window.length);
    check(
        window.indices() == (70..120),
        "scenario-feed-window-assert-initial",
        "feed_window",
        || format!("expected [70, 120) but was {:?}", window.indices()),
    )?;

    fx.board.load_more().await.context(GatewaySnafu {
        stage: "scenario-feed-window-load-more",
    })?;
    let first_index = fx.board.entries().first().map(|entry| entry.index);
    println!("grown_first_index={first_index:?}");
    check(
        first_index == Some(20),
        "scenario-feed-window-assert-grown",
        "feed_window",
        || format!("expected first index 20 but was {first_index:?}"),
    )?;

    println!("runner_ok=true");
    Ok(())
}

async fn run_empty_board() -> RunnerResult<()> {
    let mut fx = fixture(
        &BoardSettings::default(),
        MemoryWallet::connected(account(0xa1)),
        ReceiptMode::Immediate,
    );
    fx.board.refresh().await.context(GatewaySnafu {
        stage: "scenario-empty-board-refresh",
    })?;

    let empty = fx.board.view() == FeedView::Empty;
    let message_reads = fx.chain.call_counts().message_reads;
    println!("empty_view={empty}");
    println!("message_reads={message_reads}");
    check(
        empty && message_reads == 0,
        "scenario-empty-board-assert",
        "empty_board",
        || "empty board rendered rows or issued message reads".to_string(),
    )?;

    println!("runner_ok=true");
    Ok(())
}

async fn run_malformed_rows() -> RunnerResult<()> {
    let mut fx = fixture(
        &BoardSettings::default(),
        MemoryWallet::connected(account(0xa1)),
        ReceiptMode::Immediate,
    );
    fx.chain.seed_messages(account(0xb0), ["ok", "broken", "odd", "gone"]);
    fx.chain.set_raw_message(1, json!({ "unexpected": true }));
    fx.chain.set_raw_message(2, json!(["", "no sender", "not a number"]));
    fx.chain.fail_reads_at(3);

    fx.board.refresh().await.context(GatewaySnafu {
        stage: "scenario-malformed-rows-refresh",
    })?;
    let entries = fx.board.entries();
    let degraded = entries
        .iter()
        .filter(|entry| entry.sender.is_none())
        .count();
    println!("rows={}", entries.len());
    println!("degraded_rows={degraded}");
    check(
        entries.len() == 4 && degraded == 3,
        "scenario-malformed-rows-assert",
        "malformed_rows",
        || format!("expected 4 rows with 3 degraded, got {} and {degraded}", entries.len()),
    )?;

    println!("runner_ok=true");
    Ok(())
}

async fn run_post_confirmed() -> RunnerResult<()> {
    let mut fx = fixture(
        &BoardSettings::default(),
        MemoryWallet::connected(account(0xa1)),
        ReceiptMode::Held,
    );
    fx.board.refresh().await.context(GatewaySnafu {
        stage: "scenario-post-confirmed-refresh",
    })?;

    fx.board.set_draft("hello");
    let outcome = fx.board.submit();
    check(
        outcome == SubmitOutcome::Started,
        "scenario-post-confirmed-submit",
        "post_confirmed",
        || format!("submit returned {outcome:?}"),
    )?;

    let mut visited = vec![fx.board.submission_status().clone()];
    if let Some(update) = fx.board.pump().await {
        if let Some(tx_hash) = update.status.transaction() {
            println!(
                "explorer_link={}",
                NetworkSettings::default().transaction_url(&tx_hash)
            );
        }
        visited.push(update.status);
    }
    fx.chain.confirm_pending();
    visited.extend(fx.board.settle().await.into_iter().map(|update| update.status));
    println!("visited={visited:?}");

    let count_reads = fx.chain.call_counts().count_reads;
    let successes = fx.log.count(Severity::Success);
    println!("count_reads={count_reads}");
    println!("success_notifications={successes}");
    check(
        matches!(
            visited.as_slice(),
            [
                SubmissionStatus::AwaitingSignature,
                SubmissionStatus::AwaitingConfirmation(_),
                SubmissionStatus::Idle
            ]
        ) && count_reads == 2
            && successes == 1
            && fx.board.draft().is_empty(),
        "scenario-post-confirmed-assert",
        "post_confirmed",
        || "lifecycle did not settle as a single confirmed post".to_string(),
    )?;

    println!("runner_ok=true");
    Ok(())
}

async fn run_post_rejected() -> RunnerResult<()> {
    let mut fx = fixture(
        &BoardSettings::default(),
        MemoryWallet::connected(account(0xa1)),
        ReceiptMode::Immediate,
    );
    fx.chain
        .reject_next_post(RejectionDetails::default().with_message("User rejected"));

    fx.board.set_draft("hello");
    fx.board.submit();
    fx.board.settle().await;

    let errors = fx.log.entries();
    println!("notifications={}", errors.len());
    check(
        fx.board.submission_status().is_idle()
            && errors.len() == 1
            && errors[0].severity == Severity::Error
            && errors[0].message.contains("User rejected"),
        "scenario-post-rejected-assert",
        "post_rejected",
        || format!("unexpected notifications {errors:?}"),
    )?;

    println!("runner_ok=true");
    Ok(())
}

async fn run_post_disconnected() -> RunnerResult<()> {
    let mut fx = fixture(
        &BoardSettings::default(),
        MemoryWallet::new(account(0xa1)),
        ReceiptMode::Immediate,
    );
    fx.board.set_draft("hello");
    let outcome = fx.board.submit();

    let posts = fx.chain.call_counts().posts;
    let errors = fx.log.count(Severity::Error);
    println!("posts={posts}");
    println!("error_notifications={errors}");
    check(
        outcome == SubmitOutcome::WalletDisconnected && posts == 0 && errors == 1,
        "scenario-post-disconnected-assert",
        "post_disconnected",
        || format!("submit returned {outcome:?} with {posts} posts"),
    )?;

    println!("runner_ok=true");
    Ok(())
}

fn run_avatar_eviction() -> RunnerResult<()> {
    let mut cache = AvatarCache::default();
    let addresses = (0..=100u32)
        .map(|index| format!("0x{index:040x}"))
        .collect::<Vec<_>>();
    for address in &addresses {
        cache.get_or_insert_with(address, Identicon::generate);
    }

    let oldest_evicted = !cache.contains(&addresses[0]);
    println!("cache_len={}", cache.len());
    println!("oldest_evicted={oldest_evicted}");
    check(
        cache.len() == 100 && oldest_evicted,
        "scenario-avatar-eviction-assert",
        "avatar_eviction",
        || format!("cache kept {} entries", cache.len()),
    )?;

    println!("runner_ok=true");
    Ok(())
}

async fn run_configured_board(config_path: Option<PathBuf>) -> RunnerResult<()> {
    let store = open_store(config_path);
    let settings = store.settings();
    println!("config_path={}", store.path().display());
    println!("chain_id={}", settings.network.chain_id);
    match settings.network.contract() {
        Some(contract) => println!("contract={contract}"),
        None => println!("contract=unset"),
    }

    let wallet = Arc::new(MemoryWallet::connected(account(0xa1)));
    let chain = Arc::new(MemoryChain::new(wallet.clone()));
    chain.seed_messages(account(0xb0), (0..120).map(|index| format!("message {index}")));
    let toasts = Arc::new(settings.notifications.toast_center());
    let mut board = MessageBoard::from_settings(chain.clone(), wallet, toasts.clone(), &settings);

    board.refresh().await.context(GatewaySnafu {
        stage: "scenario-configured-board-refresh",
    })?;
    let rows = board.entries().len() as u64;
    let expected_rows = settings.feed.page_size.min(120);
    println!("page_size={}", settings.feed.page_size);
    println!("rows={rows}");
    check(
        rows == expected_rows,
        "scenario-configured-board-assert-window",
        "configured_board",
        || format!("expected {expected_rows} rows but got {rows}"),
    )?;

    board.set_draft("configured");
    board.submit();
    board.settle().await;
    let toast = toasts.current();
    let remaining = toast
        .as_ref()
        .map(|toast| toast.deadline.saturating_duration_since(Instant::now()));
    println!(
        "toast={}",
        toast
            .as_ref()
            .map(|toast| toast.notification.severity.to_string())
            .unwrap_or_default()
    );
    check(
        remaining.is_some_and(|left| left <= settings.notifications.dismiss_after()),
        "scenario-configured-board-assert-toast",
        "configured_board",
        || "no toast with the configured dismissal delay".to_string(),
    )?;

    println!("runner_ok=true");
    Ok(())
}

fn run_settings_save(config_path: Option<PathBuf>) -> RunnerResult<()> {
    let path = config_path.context(MissingConfigPathSnafu {
        stage: "scenario-settings-save-path",
        scenario: "settings_save",
    })?;
    let store = SettingsStore::open(path.clone());
    let saved = store
        .save(BoardSettings::clone(&store.settings()))
        .context(SettingsSnafu {
            stage: "scenario-settings-save-write",
        })?;

    let reloaded = SettingsStore::open(path).settings();
    println!("config_path={}", store.path().display());
    println!("roundtrip_equal={}", reloaded == saved);
    check(
        reloaded == saved,
        "scenario-settings-save-assert",
        "settings_save",
        || "reloaded settings differ from the saved ones".to_string(),
    )?;

    println!("runner_ok=true");
    Ok(())
}

async fn run_all(config_path: Option<PathBuf>) -> RunnerResult<()> {
    run_feed_window().await?;
    run_empty_board().await?;
    run_malformed_rows().await?;
    run_post_confirmed().await?;
    run_post_rejected().await?;
    run_post_disconnected().await?;
    run_avatar_eviction()?;
    run_configured_board(config_path.clone()).await?;
    if config_path.is_some() {
        run_settings_save(config_path)?;
    }

    println!("all_passed=true");
    Ok(())
}
