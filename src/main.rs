//! sitewide-comment-control - Network-wide comment moderation gate
//!
//! A host hook that classifies comments before they are stored and tells the
//! host what to do with them afterwards.
//!
//! # Usage
//!
//! ```bash
//! # As a host hook (reads JSON from stdin, writes JSON to stdout)
//! echo '{"hook":"preprocess_comment","comment":{"comment_author_email":"x@example.com"}}' \
//!     | sitewide-comment-control
//!
//! # Seed and upgrade the stored configuration
//! sitewide-comment-control --activate
//! sitewide-comment-control --upgrade
//!
//! # Replace the lists from an admin form
//! echo '{"blocklist":"trash@example.com","token":"..."}' | sitewide-comment-control --update-rules
//! ```

use std::env;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, warn};

use sitewide_comment_control::{
    admin::{AdminForm, AdminPage, AdminRequest, StaticToken},
    audit::{AuditEntry, AuditLogger},
    config::Config,
    engine::{CommentEngine, DRY_RUN_ENV},
    input::HookInput,
    migrate,
    output::{fail_open_reply, to_json, AdminReply, PostprocessReply},
    store::{JsonFileStore, RulesHandle},
};

/// Print version information
fn print_version() {
    println!("sitewide-comment-control {}", env!("CARGO_PKG_VERSION"));
}

/// Print help message
fn print_help() {
    println!(
        r#"sitewide-comment-control - Network-wide comment moderation gate

USAGE:
    sitewide-comment-control [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -v, --version           Print version information
    -c, --config PATH       Path to config file
    -s, --store PATH        Path to the JSON settings store
    -d, --dry-run           Classify and log, but always allow
        --activate          Seed placeholder lists if none are stored
        --upgrade           Upgrade stored settings from older releases
        --show-rules        Print the current lists as form text
        --update-rules      Read an admin form (JSON) from stdin and apply it

ENVIRONMENT:
    COMMENT_CONTROL_DISABLED=1   Allow everything (still logs)
    COMMENT_CONTROL_DRY_RUN=1    Same as --dry-run
    (0, false, no, off or an empty value leave an override unset)

USAGE AS HOOK:
    Pre-persist:
      {{"hook":"preprocess_comment","comment":{{"comment_author":"...", ...}}}}
      -> {{"comment":{{...}},"verdict":"allow|hold|spam|trash"}}

    Post-persist:
      {{"hook":"comment_post","comment_id":12,"commentdata":{{"verdict":"trash"}}}}
      -> {{"comment_id":12,"action":"trash|spam|none"}}
"#
    );
}

/// What the invocation should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Hook,
    Activate,
    Upgrade,
    ShowRules,
    UpdateRules,
}

/// Parse command line arguments
struct Args {
    help: bool,
    version: bool,
    dry_run: bool,
    config_path: Option<String>,
    store_path: Option<String>,
    mode: Mode,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut result = Args {
            help: false,
            version: false,
            dry_run: false,
            config_path: None,
            store_path: None,
            mode: Mode::Hook,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-h" | "--help" => result.help = true,
                "-v" | "--version" => result.version = true,
                "-d" | "--dry-run" => result.dry_run = true,
                "--activate" => result.mode = Mode::Activate,
                "--upgrade" => result.mode = Mode::Upgrade,
                "--show-rules" => result.mode = Mode::ShowRules,
                "--update-rules" => result.mode = Mode::UpdateRules,
                "-c" | "--config" => {
                    if i + 1 < args.len() {
                        i += 1;
                        result.config_path = Some(args[i].clone());
                    }
                }
                "-s" | "--store" => {
                    if i + 1 < args.len() {
                        i += 1;
                        result.store_path = Some(args[i].clone());
                    }
                }
                arg if arg.starts_with("--config=") => {
                    let path = arg.trim_start_matches("--config=");
                    result.config_path = Some(path.to_string());
                }
                arg if arg.starts_with("--store=") => {
                    let path = arg.trim_start_matches("--store=");
                    result.store_path = Some(path.to_string());
                }
                _ => {}
            }
            i += 1;
        }

        result
    }
}

/// Read all of stdin; a read error counts as empty input
fn read_stdin() -> String {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        warn!(error = %e, "failed to read stdin");
        input.clear();
    }
    input
}

/// Write one reply line to stdout
fn reply(json: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = writeln!(handle, "{}", json);
    let _ = handle.flush();
}

fn run_activate(store: &JsonFileStore) -> i32 {
    match migrate::activate(store) {
        Ok(seeded) => {
            let notice = if seeded {
                "Placeholder lists seeded."
            } else {
                "Lists already configured; nothing to do."
            };
            reply(&to_json(&AdminReply {
                ok: true,
                notice: notice.to_string(),
                version: None,
            }));
            0
        }
        Err(e) => {
            error!(error = %e, "activation failed");
            1
        }
    }
}

fn run_upgrade(store: &JsonFileStore) -> i32 {
    match migrate::upgrade(store) {
        Ok(report) => {
            reply(&to_json(&report));
            0
        }
        Err(e) => {
            error!(error = %e, "upgrade failed");
            1
        }
    }
}

fn run_show_rules(store: &JsonFileStore, config: &Config) -> i32 {
    let handle = RulesHandle::from_store(store);
    let verifier = StaticToken::new(config.admin.token.clone());
    let page = AdminPage::new(store, &handle, &verifier);
    reply(&to_json(&page.prefill()));
    0
}

fn run_update_rules(store: &JsonFileStore, config: &Config) -> i32 {
    let failed = |notice: String| {
        reply(&to_json(&AdminReply {
            ok: false,
            notice,
            version: None,
        }));
        1
    };

    let form: AdminForm = match serde_json::from_str(&read_stdin()) {
        Ok(form) => form,
        Err(e) => return failed(format!("Invalid form: {}", e)),
    };

    let handle = RulesHandle::from_store(store);
    let verifier = StaticToken::new(config.admin.token.clone());
    let page = AdminPage::new(store, &handle, &verifier);

    // Whoever can run the binary against the store holds the capability
    let request = AdminRequest {
        can_manage_network: true,
        form,
    };

    match page.update(request) {
        Ok(notice) => {
            reply(&to_json(&AdminReply {
                ok: true,
                notice: notice.message.to_string(),
                version: Some(notice.version),
            }));
            0
        }
        Err(e) => failed(e.to_string()),
    }
}

fn run_hook(store: &JsonFileStore, config: &Config) {
    let input_json = read_stdin();

    // Handle empty input
    if input_json.trim().is_empty() {
        reply(&fail_open_reply(&input_json));
        return;
    }

    // Stored settings from older releases are brought up to date first
    if let Err(e) = migrate::upgrade(store) {
        warn!(error = %e, "settings upgrade failed; continuing with stored rules");
    }

    let handle = Arc::new(RulesHandle::from_store(store));
    let engine = CommentEngine::new(config, handle);
    let mut logger = AuditLogger::new(config.audit_path().as_deref());

    // Parse input
    let input = match HookInput::from_json(&input_json) {
        Ok(input) => input,
        Err(e) => {
            // Fail open: a broken payload must not block the comment
            warn!(error = %e, "failed to parse hook input; allowing");
            let entry = AuditEntry::error("unknown", String::new(), e.to_string());
            if let Err(e) = logger.log(&entry) {
                warn!(error = %e, "failed to write audit log");
            }
            reply(&fail_open_reply(&input_json));
            return;
        }
    };

    let dry_run = engine.is_dry_run();

    let (json, entry) = match input {
        HookInput::Preprocess { comment } => {
            let (output, classification) = engine.preprocess(comment);
            let entry = AuditEntry::classification(&output.comment, &classification, dry_run);
            (to_json(&output), entry)
        }
        HookInput::Postprocess {
            comment_id,
            commentdata,
            ..
        } => {
            let verdict = commentdata.verdict();
            let action = engine.postprocess(verdict);
            let entry = AuditEntry::effect(comment_id, verdict, action, dry_run);
            (to_json(&PostprocessReply { comment_id, action }), entry)
        }
    };

    // Log the decision
    if let Err(e) = logger.log(&entry) {
        warn!(error = %e, "failed to write audit log");
    }

    reply(&json);
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    // Handle help and version
    if args.help {
        print_help();
        return;
    }

    if args.version {
        print_version();
        return;
    }

    // Load configuration
    let config = if let Some(ref path) = args.config_path {
        Config::load_from(Path::new(path)).unwrap_or_else(|e| {
            warn!(path = %path, error = %e, "failed to load config; using defaults");
            Config::default()
        })
    } else {
        Config::load()
    };

    // Set up dry-run mode via environment
    if args.dry_run || config.general.dry_run {
        env::set_var(DRY_RUN_ENV, "1");
    }

    let store_path = args
        .store_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.store_path());
    let store = JsonFileStore::new(store_path);

    let code = match args.mode {
        Mode::Hook => {
            run_hook(&store, &config);
            0
        }
        Mode::Activate => run_activate(&store),
        Mode::Upgrade => run_upgrade(&store),
        Mode::ShowRules => run_show_rules(&store, &config),
        Mode::UpdateRules => run_update_rules(&store, &config),
    };

    if code != 0 {
        std::process::exit(code);
    }
}
