use crate::checkpoint::run_history::RunPredicate;
use crate::sync::FeedErrorPolicy;
use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use typed_builder::TypedBuilder;

pub const DEFAULT_POCKET_API_URL: &str = "https://getpocket.com/v3/add";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_REQUEST_TIMEOUT_IN_SECONDS: u64 = 30;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingEnv(String),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
    #[error("no feeds configured")]
    NoFeeds,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CheckpointStrategy {
    Artifact,
    RunHistory,
}

impl FromStr for CheckpointStrategy {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "artifact" => Ok(Self::Artifact),
            "run_history" | "run-history" => Ok(Self::RunHistory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, TypedBuilder)]
pub struct GithubContext {
    #[builder(setter(into))]
    pub owner: String,
    #[builder(setter(into))]
    pub repo: String,
    #[builder(setter(into))]
    pub workflow: String,
    #[builder(default, setter(into))]
    pub token: Option<String>,
    #[builder(default = DEFAULT_GITHUB_API_URL.to_string(), setter(into))]
    pub api_url: String,
    #[builder(default, setter(into))]
    pub run_id: Option<u64>,
}

#[derive(Debug, Clone, Eq, PartialEq, TypedBuilder)]
pub struct Config {
    pub feeds: Vec<String>,
    #[builder(setter(into))]
    pub consumer_key: String,
    #[builder(setter(into))]
    pub access_token: String,
    #[builder(default = DEFAULT_POCKET_API_URL.to_string(), setter(into))]
    pub pocket_api_url: String,
    #[builder(default = CheckpointStrategy::RunHistory)]
    pub strategy: CheckpointStrategy,
    #[builder(default = RunPredicate::Success)]
    pub run_predicate: RunPredicate,
    #[builder(default = FeedErrorPolicy::Abort)]
    pub on_feed_error: FeedErrorPolicy,
    #[builder(default = false)]
    pub fail_on_delivery_error: bool,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT_IN_SECONDS)]
    pub request_timeout_in_seconds: u64,
    /// Root of `DirArtifactStore`. Must be cached by the workflow to persist
    /// between runs.
    #[builder(default = PathBuf::from(".artifacts"), setter(into))]
    pub artifact_dir: PathBuf,
    #[builder(default = PathBuf::from("_persist_action_dir"), setter(into))]
    pub work_dir: PathBuf,
    /// Present only for the run-history strategy.
    #[builder(default)]
    pub github: Option<GithubContext>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Action inputs arrive as `INPUT_<NAME>`; plain `<NAME>` is accepted as well.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let input = |name: &str| {
            lookup(&format!("INPUT_{name}"))
                .or_else(|| lookup(name))
                .filter(|value| !value.trim().is_empty())
        };
        let required =
            |name: &str| input(name).ok_or_else(|| ConfigError::MissingEnv(name.to_string()));

        let feeds = parse_feeds(&input("FEEDS").unwrap_or_default());

        if feeds.is_empty() {
            return Err(ConfigError::NoFeeds);
        }

        let strategy = parse_or(
            "CHECKPOINT_STRATEGY",
            input("CHECKPOINT_STRATEGY"),
            CheckpointStrategy::RunHistory,
        )?;
        let run_predicate =
            parse_or("RUN_PREDICATE", input("RUN_PREDICATE"), RunPredicate::Success)?;
        let on_feed_error =
            parse_or("ON_FEED_ERROR", input("ON_FEED_ERROR"), FeedErrorPolicy::Abort)?;
        let fail_on_delivery_error = match input("FAIL_ON_DELIVERY_ERROR") {
            None => false,
            Some(value) => parse_bool(&value).ok_or(ConfigError::InvalidValue {
                name: "FAIL_ON_DELIVERY_ERROR".to_string(),
                value,
            })?,
        };
        let request_timeout_in_seconds = match input("REQUEST_TIMEOUT_IN_SECONDS") {
            None => DEFAULT_REQUEST_TIMEOUT_IN_SECONDS,
            Some(value) => {
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidValue {
                        name: "REQUEST_TIMEOUT_IN_SECONDS".to_string(),
                        value,
                    })?
            }
        };

        let cwd = env::current_dir().unwrap_or_default();
        let artifact_dir = input("ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.join(".artifacts"));
        let work_dir = input("WORKDIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.join("_persist_action_dir"));

        let github = match strategy {
            CheckpointStrategy::RunHistory => Some(github_context(&lookup)?),
            CheckpointStrategy::Artifact => None,
        };

        Ok(Config {
            feeds,
            consumer_key: required("POCKET_CONSUMER_KEY")?,
            access_token: required("POCKET_ACCESS_TOKEN")?,
            pocket_api_url: input("POCKET_API_URL")
                .unwrap_or_else(|| DEFAULT_POCKET_API_URL.to_string()),
            strategy,
            run_predicate,
            on_feed_error,
            fail_on_delivery_error,
            request_timeout_in_seconds,
            artifact_dir,
            work_dir,
            github,
        })
    }
}

pub fn parse_feeds(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|feed| feed.trim())
        .filter(|feed| !feed.is_empty())
        .map(|feed| feed.to_string())
        .collect()
}

fn github_context<F>(lookup: &F) -> Result<GithubContext, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    let repository = env("GITHUB_REPOSITORY")
        .ok_or_else(|| ConfigError::MissingEnv("GITHUB_REPOSITORY".to_string()))?;
    let workflow = env("GITHUB_WORKFLOW")
        .ok_or_else(|| ConfigError::MissingEnv("GITHUB_WORKFLOW".to_string()))?;

    let (owner, repo) = match repository.trim().split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            (owner.to_string(), repo.to_string())
        }
        _ => {
            return Err(ConfigError::InvalidValue {
                name: "GITHUB_REPOSITORY".to_string(),
                value: repository.clone(),
            })
        }
    };

    let run_id = match env("GITHUB_RUN_ID") {
        None => None,
        Some(value) => {
            let run_id = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "GITHUB_RUN_ID".to_string(),
                    value,
                })?;

            Some(run_id)
        }
    };

    Ok(GithubContext {
        owner,
        repo,
        workflow,
        token: env("GITHUB_TOKEN").or_else(|| env("INPUT_GITHUB_TOKEN")),
        api_url: env("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
        run_id,
    })
}

fn parse_or<T: FromStr>(name: &str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        move |name| vars.get(name).cloned()
    }

    const BASE: [(&str, &str); 5] = [
        ("INPUT_FEEDS", "https://example.com/a.xml, https://example.com/b.xml,"),
        ("INPUT_POCKET_CONSUMER_KEY", "key"),
        ("INPUT_POCKET_ACCESS_TOKEN", "token"),
        ("GITHUB_REPOSITORY", "octo/reader"),
        ("GITHUB_WORKFLOW", "Sync feeds"),
    ];

    #[test]
    fn splits_feeds_on_commas() {
        assert_eq!(
            parse_feeds("https://a.com/feed,  https://b.com/feed ,,"),
            vec!["https://a.com/feed".to_string(), "https://b.com/feed".to_string()]
        );
        assert!(parse_feeds(" , ").is_empty());
    }

    #[test]
    fn reads_run_history_config() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();

        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.consumer_key, "key");
        assert_eq!(config.strategy, CheckpointStrategy::RunHistory);
        assert_eq!(config.run_predicate, RunPredicate::Success);
        assert_eq!(config.on_feed_error, FeedErrorPolicy::Abort);
        assert!(!config.fail_on_delivery_error);

        let github = config.github.unwrap();
        assert_eq!(github.owner, "octo");
        assert_eq!(github.repo, "reader");
        assert_eq!(github.workflow, "Sync feeds");
        assert_eq!(github.api_url, DEFAULT_GITHUB_API_URL);
    }

    #[test]
    fn fails_without_feeds() {
        let result = Config::from_lookup(lookup(&[
            ("INPUT_FEEDS", " "),
            ("INPUT_POCKET_CONSUMER_KEY", "key"),
            ("INPUT_POCKET_ACCESS_TOKEN", "token"),
        ]));

        assert_eq!(result, Err(ConfigError::NoFeeds));
    }

    #[test]
    fn fails_without_workflow_identity() {
        let result = Config::from_lookup(lookup(&BASE[..4]));

        assert_eq!(
            result,
            Err(ConfigError::MissingEnv("GITHUB_WORKFLOW".to_string()))
        );
    }

    #[test]
    fn artifact_strategy_does_not_need_identity() {
        let config = Config::from_lookup(lookup(&[
            ("FEEDS", "https://example.com/a.xml"),
            ("POCKET_CONSUMER_KEY", "key"),
            ("POCKET_ACCESS_TOKEN", "token"),
            ("CHECKPOINT_STRATEGY", "artifact"),
            ("ON_FEED_ERROR", "skip"),
            ("FAIL_ON_DELIVERY_ERROR", "true"),
            ("ARTIFACT_DIR", "/home/runner/.cache/feeds"),
        ]))
        .unwrap();

        assert_eq!(config.strategy, CheckpointStrategy::Artifact);
        assert_eq!(config.artifact_dir, PathBuf::from("/home/runner/.cache/feeds"));
        assert_eq!(config.on_feed_error, FeedErrorPolicy::Skip);
        assert!(config.fail_on_delivery_error);
        assert!(config.github.is_none());
    }

    #[test]
    fn rejects_malformed_repository() {
        let mut vars = BASE.to_vec();
        vars[3] = ("GITHUB_REPOSITORY", "reader");

        let result = Config::from_lookup(lookup(&vars));

        assert_eq!(
            result,
            Err(ConfigError::InvalidValue {
                name: "GITHUB_REPOSITORY".to_string(),
                value: "reader".to_string()
            })
        );
    }

    #[test]
    fn rejects_unknown_predicate() {
        let mut vars = BASE.to_vec();
        vars.push(("INPUT_RUN_PREDICATE", "sometimes"));

        assert!(matches!(
            Config::from_lookup(lookup(&vars)),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
