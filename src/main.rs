use std::io::Write;
use std::process;

use clap::{Arg, Command};
use log::LevelFilter;
use url::Url;

use mailsweep::config::Config;
use mailsweep::criteria::SearchCriteria;
use mailsweep::engine::{RemediationAction, RemediationResult, SweepEngine};
use mailsweep::mail_service::HttpMailService;
use mailsweep::mailbox_directory::MailboxDirectory;
use mailsweep::secret_client::ScssClient;
use mailsweep::test_mailer;
use mailsweep::threat_feeds::ThreatFeedClient;
use mailsweep::validation::InputValidator;

#[tokio::main]
async fn main() {
    let matches = Command::new("mailsweep")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sweeps an organization's mailboxes for threat emails and quarantines or deletes the matches")
        .arg(
            Arg::new("action")
                .help("Remediation action to perform: pull = quarantine, purge = delete")
                .value_parser(["pull", "purge"])
                .default_value("pull"),
        )
        .arg(
            Arg::new("sender")
                .long("sender")
                .value_name("ADDRESS")
                .help("Sender address to search for"),
        )
        .arg(
            Arg::new("subject")
                .long("subject")
                .value_name("SUBJECT")
                .help("Subject line to search for (quote it in your shell)"),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("URL to search for; cannot be combined with other criteria"),
        )
        .arg(
            Arg::new("hash")
                .long("hash")
                .value_name("SHA1")
                .help("SHA-1 hash of an attachment to search for; cannot be combined with other criteria"),
        )
        .arg(
            Arg::new("file-extension")
                .long("file-extension")
                .value_name("EXT")
                .help("Attachment file extension to search for, without the dot"),
        )
        .arg(
            Arg::new("feed-sweep")
                .long("feed-sweep")
                .help("Sweep for every URL on the configured blocklist feeds instead of one criteria search")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("send-probe")
                .long("send-probe")
                .help("Send a verification probe mail and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("mailsweep.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        generate_default_config(path);
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("send-probe") {
        let Some(test_mail) = config.test_mail.as_ref() else {
            eprintln!("--send-probe requires a test_mail section in the configuration");
            process::exit(1);
        };
        let probe = test_mailer::build_probe();
        if let Err(e) = test_mailer::send_probe(test_mail, &probe).await {
            eprintln!("Error sending probe: {e}");
            process::exit(1);
        }
        println!("Probe sent to {}.", test_mail.recipient);
        println!(
            "Search for subject {:?} to verify the sweep path.",
            probe.subject
        );
        return;
    }

    let action = match matches.get_one::<String>("action").unwrap().as_str() {
        "purge" => RemediationAction::Delete,
        _ => RemediationAction::Quarantine,
    };

    if let Err(message) = validate_inputs(&matches) {
        eprintln!("{message}");
        process::exit(1);
    }

    let token = match resolve_token(&config).await {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Error resolving service credential: {e:#}");
            process::exit(1);
        }
    };

    let directory = match MailboxDirectory::load(&config.directory).await {
        Ok(directory) => directory,
        Err(e) => {
            eprintln!("Error resolving mailbox directory: {e}");
            process::exit(1);
        }
    };
    if directory.is_empty() {
        eprintln!("Mailbox directory is empty; nothing to sweep.");
        process::exit(1);
    }

    let service = match HttpMailService::new(&config.service.base_url, &token) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error building service client: {e}");
            process::exit(1);
        }
    };
    let mut engine = SweepEngine::new(service);

    let found = if matches.get_flag("feed-sweep") {
        let urls = match collect_feed_urls(&config).await {
            Ok(urls) => urls,
            Err(e) => {
                eprintln!("Error fetching blocklist feeds: {e:#}");
                process::exit(1);
            }
        };
        if urls.is_empty() {
            println!("Blocklist feeds yielded no URLs.");
            return;
        }
        log::info!("sweeping for {} blocklisted URL(s)", urls.len());
        let mut all = Vec::new();
        for url in urls {
            let criteria = SearchCriteria::Url { url };
            all.extend(engine.search(&criteria, directory.mailboxes()).await);
        }
        all
    } else {
        let criteria = match SearchCriteria::from_parts(
            matches.get_one::<String>("sender").cloned(),
            matches.get_one::<String>("subject").cloned(),
            matches.get_one::<String>("file-extension").cloned(),
            matches.get_one::<String>("hash").cloned(),
            matches.get_one::<String>("url").cloned(),
        ) {
            Ok(criteria) => criteria,
            Err(e) => {
                eprintln!("Invalid search: {e}");
                process::exit(1);
            }
        };
        engine.search(&criteria, directory.mailboxes()).await
    };

    if found.is_empty() {
        println!("No matching messages found.");
        return;
    }

    println!("{}WARNING{}", "*".repeat(32), "*".repeat(32));
    println!(
        "You are about to {action} {} message(s) across {} mailbox(es).",
        found.len(),
        directory.len()
    );
    if !confirm("Proceed? [y/N] ") {
        println!("{}ABORTING{}", "*".repeat(32), "*".repeat(32));
        return;
    }

    let result = match engine.remediate(action, &found).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Remediation refused: {e}");
            process::exit(1);
        }
    };
    print_summary(&result);
    if !result.failed.is_empty() {
        process::exit(1);
    }
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your environment.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

/// Check operator-supplied fields before anything touches the network.
fn validate_inputs(matches: &clap::ArgMatches) -> Result<(), String> {
    let validator =
        InputValidator::new().map_err(|e| format!("Internal validation error: {e}"))?;
    if let Some(sender) = matches.get_one::<String>("sender") {
        if !validator.email(sender) {
            return Err("Sender address failed input validation.".to_string());
        }
    }
    if let Some(hash) = matches.get_one::<String>("hash") {
        if !validator.sha1(hash) {
            return Err("File hash must be 40 hex characters.".to_string());
        }
    }
    if let Some(extension) = matches.get_one::<String>("file-extension") {
        if !validator.file_ext(extension) {
            return Err("File extension failed input validation (omit the dot).".to_string());
        }
    }
    if let Some(subject) = matches.get_one::<String>("subject") {
        if !validator.subject(subject) {
            return Err("Subject line failed input validation.".to_string());
        }
    }
    if let Some(url) = matches.get_one::<String>("url") {
        if Url::parse(url).is_err() {
            return Err("URL failed input validation.".to_string());
        }
    }
    Ok(())
}

async fn resolve_token(config: &Config) -> anyhow::Result<String> {
    use anyhow::Context;
    if let Some(token) = &config.service.token {
        return Ok(token.clone());
    }
    let scss = config
        .scss
        .as_ref()
        .context("no service token configured and no scss section to fetch one from")?;
    let client = ScssClient::new()?;
    Ok(client.fetch_secret(scss).await?)
}

async fn collect_feed_urls(config: &Config) -> anyhow::Result<Vec<String>> {
    use anyhow::Context;
    let feeds = config
        .feeds
        .as_ref()
        .context("feed sweep requires a feeds section in the configuration")?;
    let client = ThreatFeedClient::new()?;
    let mut urls = Vec::new();
    if let Some(api_key) = &feeds.phish_tank_api_key {
        urls.extend(client.phish_tank_urls(api_key).await?);
    }
    if feeds.openphish {
        urls.extend(client.openphish_urls().await?);
    }
    Ok(urls)
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt}");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    line.trim().eq_ignore_ascii_case("y")
}

fn print_summary(result: &RemediationResult) {
    println!("Attempted: {}", result.attempted);
    println!("Succeeded: {}", result.succeeded);
    println!("Failed:    {}", result.failed.len());
    for item in &result.failed {
        println!(
            "  {} ({}): {}",
            item.record.mailbox, item.record.message_id, item.reason
        );
    }
}
