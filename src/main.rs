//! jira-rest - command line front end of the library.
//!
//! Connects with a profile from the configuration file and runs one action
//! on the JIRA instance.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use jira_rest::api;
use jira_rest::config::Config;
use jira_rest::{logging, Issue, JiraClient};

/// Default number of issues printed by `search`.
const SEARCH_LIMIT: u32 = 50;

#[derive(Parser, Debug)]
#[command(version, about = "Work with JIRA issues from the terminal")]
struct Cli {
    /// Profile from the configuration file; the default profile when omitted.
    #[arg(long, short = 'p', global = true)]
    profile: Option<String>,

    /// Mirror log events on stderr.
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Issue actions.
    #[command(subcommand)]
    Issue(IssueCommand),

    /// Print the key and summary of issues matching a JQL query.
    Search {
        jql: String,
        #[arg(long, default_value_t = SEARCH_LIMIT)]
        limit: u32,
    },

    /// Manage the API token of a profile in the OS keyring.
    #[command(subcommand)]
    Token(TokenCommand),
}

#[derive(Debug, Subcommand)]
enum IssueCommand {
    /// Print the main fields of an issue.
    Show { key: String },

    /// Comment an issue.
    Comment { key: String, text: String },

    /// Move an issue through the workflow step with this name.
    Step {
        key: String,
        step: String,
        /// Accept a step that keeps the issue in its current status.
        #[arg(long, default_value_t = false)]
        same_status: bool,
    },

    /// Assign an issue; without a user the issue is unassigned.
    Assign { key: String, user: Option<String> },

    /// Start or stop watching an issue as the current user.
    Watch {
        key: String,
        #[arg(long, default_value_t = false)]
        stop: bool,
    },

    /// Add labels to an issue.
    Label {
        key: String,
        #[arg(required = true)]
        labels: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum TokenCommand {
    /// Store a token for the profile.
    Set { token: String },
    /// Forget the token of the profile.
    Delete,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose).context("Failed to initialize logging")?;

    if let Err(e) = run(cli).await {
        error!(error = %e, "Command failed");
        if let Some(err) = e.downcast_ref::<jira_rest::Error>() {
            eprintln!("{}", err.user_message());
            if let Some(action) = err.suggested_action() {
                eprintln!("{}", action);
            }
            std::process::exit(1);
        }
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let profile = config.select(cli.profile.as_deref())?;

    if let Command::Token(action) = &cli.command {
        match action {
            TokenCommand::Set { token } => {
                api::store_token(&profile.name, token)?;
                println!("Token stored for profile '{}'", profile.name);
            }
            TokenCommand::Delete => {
                api::delete_token(&profile.name)?;
                println!("Token deleted for profile '{}'", profile.name);
            }
        }
        return Ok(());
    }

    let client = profile.connect(&config.settings)?;
    info!(profile = %profile.name, url = %client.jira_url(), "Connected");

    match cli.command {
        Command::Issue(action) => run_issue(action, &client).await,
        Command::Search { jql, limit } => {
            let issues = Issue::search(&jql, &["key", "summary"], &[], limit, 0, &client).await?;
            for mut issue in issues {
                let summary = issue.summary().await?;
                println!("{}\t{}", issue.key(), summary);
            }
            Ok(())
        }
        Command::Token(_) => Ok(()),
    }
}

async fn run_issue(action: IssueCommand, client: &JiraClient) -> anyhow::Result<()> {
    match action {
        IssueCommand::Show { key } => {
            let mut issue = Issue::new(&key, client)?;
            let summary = issue.summary().await?;
            let status = issue.status().await?.name().await?;
            let issue_type = issue.issue_type().await?.name().await?;
            let assignee = match issue.assignee().await? {
                Some(user) => user.name().to_string(),
                None => "Unassigned".to_string(),
            };

            println!("[{}]: {}", issue.key(), summary);
            println!("Type:     {}", issue_type);
            println!("Status:   {}", status);
            println!("Assignee: {}", assignee);
            let labels = issue.labels().await?;
            if !labels.is_empty() {
                println!("Labels:   {}", labels.join(", "));
            }
            println!("{}", issue.url());
        }
        IssueCommand::Comment { key, text } => {
            if text.trim().is_empty() {
                bail!("Comment text is empty");
            }
            let mut issue = Issue::new(&key, client)?;
            let comment = issue.add_comment(&text, None).await?;
            println!("Comment {} added to {}", comment.id(), key);
        }
        IssueCommand::Step {
            key,
            step,
            same_status,
        } => {
            let mut issue = Issue::new(&key, client)?;
            issue.step(&step, same_status, true).await?;
            let status = issue.status().await?.name().await?;
            println!("{} is now '{}'", key, status);
        }
        IssueCommand::Assign { key, user } => {
            client.issue().assign(&key, user.as_deref()).await?;
            match user {
                Some(user) => println!("{} assigned to {}", key, user),
                None => println!("{} unassigned", key),
            }
        }
        IssueCommand::Watch { key, stop } => {
            let mut issue = Issue::new(&key, client)?;
            let login = client.login().to_string();
            if stop {
                issue.watchers().remove(&[&login]).await?;
                println!("Stopped watching {}", key);
            } else {
                issue.watchers().add(&[&login]).await?;
                println!("Watching {}", key);
            }
        }
        IssueCommand::Label { key, labels } => {
            let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
            let mut issue = Issue::new(&key, client)?;
            issue.add_labels(&labels);
            issue.save(&[], true).await?;
            println!("Labels added to {}", key);
        }
    }
    Ok(())
}
