use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

mod auth;
mod campus;
mod client;
mod config;
mod error;
mod fetch;
mod logging;
mod models;
mod projection;
mod report;

use client::ApiClient;
use config::{
    Credentials, FetchOptions, RosterQuery, DEFAULT_API_URL, DEFAULT_CAMPUS_ID, DEFAULT_CURSUS_ID,
};
use fetch::Paginator;
use models::StudentRecord;
use report::RunSummary;

#[derive(Parser)]
#[command(name = "fortytwo-cursus-export")]
#[command(about = "Export a campus cursus roster from the 42 intra API", long_about = None)]
struct Cli {
    /// Base URL of the 42 API
    #[arg(long, global = true, env = "FORTYTWO_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every cursus user of a campus and write them to a JSON file
    Export {
        #[arg(long, default_value = "42_cursus_users.json")]
        out: PathBuf,
        #[arg(long, env = "FORTYTWO_CAMPUS_ID", default_value_t = DEFAULT_CAMPUS_ID)]
        campus_id: u32,
        /// Resolve the campus id by name, falling back to --campus-id
        #[arg(long)]
        campus_name: Option<String>,
        #[arg(long, env = "FORTYTWO_CURSUS_ID", default_value_t = DEFAULT_CURSUS_ID)]
        cursus_id: u32,
        #[arg(long, default_value = "4,30")]
        level_range: String,
        #[arg(long, default_value_t = 100)]
        page_size: u32,
        /// Pause between successful pages
        #[arg(long, default_value_t = 500)]
        page_delay_ms: u64,
        #[arg(long, default_value_t = 10)]
        max_rate_limit_retries: u32,
        /// Upper bound on a single rate-limit wait
        #[arg(long, default_value_t = 120)]
        max_retry_wait_secs: u64,
    },
    /// List campus ids and names
    Campuses {
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logging::init_console_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let credentials = Credentials::from_env()?;
    let client = ApiClient::new(&cli.api_url, Duration::from_secs(cli.timeout_secs))
        .context("failed to build HTTP client")?;

    match cli.command {
        Commands::Export {
            out,
            campus_id,
            campus_name,
            cursus_id,
            level_range,
            page_size,
            page_delay_ms,
            max_rate_limit_retries,
            max_retry_wait_secs,
        } => {
            let options = FetchOptions {
                page_size,
                page_delay: Duration::from_millis(page_delay_ms),
                max_retry_wait: Duration::from_secs(max_retry_wait_secs),
                max_rate_limit_retries,
                ..FetchOptions::default()
            };
            options.validate()?;

            let query = RosterQuery {
                campus_id,
                cursus_id,
                level_range,
                ..RosterQuery::default()
            };

            let summary = export(
                &client,
                &credentials,
                query,
                campus_name.as_deref(),
                &options,
                &out,
            )
            .await?;
            print!("{}", report::render_summary(&summary, &out));
        }
        Commands::Campuses { name } => {
            let token = auth::acquire_token(&client, &credentials)
                .await
                .context("could not authenticate with the 42 API")?;
            let options = FetchOptions::default();
            let paginator = Paginator::new(&client, &token, &options);
            let outcome = campus::list_campuses(&paginator)
                .await
                .context("failed to list campuses")?;

            let matches = campus::filter_campuses(&outcome.records, name.as_deref());
            if matches.is_empty() {
                println!("No campuses matched.");
                return Ok(());
            }
            for campus in matches {
                println!("{}\t{}", campus.id, campus.name());
            }
        }
    }

    Ok(())
}

async fn export(
    client: &ApiClient,
    credentials: &Credentials,
    mut query: RosterQuery,
    campus_name: Option<&str>,
    options: &FetchOptions,
    out: &Path,
) -> anyhow::Result<RunSummary> {
    let token = auth::acquire_token(client, credentials)
        .await
        .context("could not authenticate with the 42 API")?;
    let paginator = Paginator::new(client, &token, options);

    if let Some(name) = campus_name {
        query.campus_id = campus::resolve_campus_id(&paginator, name, query.campus_id)
            .await
            .context("failed to resolve campus")?;
    }

    info!(
        campus_id = query.campus_id,
        cursus_id = query.cursus_id,
        "fetching cursus users"
    );
    let outcome = paginator
        .fetch_all::<StudentRecord>(&query.path(), &query.params())
        .await
        .with_context(|| format!("failed to fetch users of cursus {}", query.cursus_id))?;

    let projected = projection::project_records(&outcome.records);
    report::write_export(out, &projected)?;
    info!(records = projected.len(), out = %out.display(), "export written");

    Ok(RunSummary::new(
        &projected,
        outcome.requests,
        outcome.pages,
        outcome.rate_limit_waits,
    ))
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::FetchError;

    const ROSTER_PATH: &str = "/v2/cursus/21/cursus_users";

    fn credentials() -> Credentials {
        Credentials {
            client_id: "test-id".to_string(),
            client_secret: "test-secret".to_string(),
        }
    }

    fn options() -> FetchOptions {
        FetchOptions {
            page_delay: Duration::ZERO,
            ..FetchOptions::default()
        }
    }

    fn student(id: u64, alumni: bool, active: bool) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "level": 10.5,
            "grade": "Member",
            "cursus_id": 21,
            "blackholed_at": null,
            "user": {
                "login": format!("cadet{id}"),
                "usual_full_name": null,
                "first_name": "Cadet",
                "last_name": id.to_string(),
                "wallet": 100,
                "active?": active,
                "alumni?": alumni,
                "pool_month": "july",
                "pool_year": "2021"
            }
        })
    }

    async fn mount_token(server: &MockServer, status: u16) {
        let template = if status == 200 {
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access_token": "test-token" }))
        } else {
            ResponseTemplate::new(status).set_body_string("invalid_client")
        };

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(template)
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_roster_page(server: &MockServer, page: u32, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(ROSTER_PATH))
            .and(query_param("page[number]", page.to_string()))
            .respond_with(template)
            .mount(server)
            .await;
    }

    async fn roster_requests(server: &MockServer) -> usize {
        server
            .received_requests()
            .await
            .expect("recording enabled")
            .iter()
            .filter(|request| request.url.path() == ROSTER_PATH)
            .count()
    }

    async fn run_export(server: &MockServer, out: &Path) -> anyhow::Result<RunSummary> {
        let client = ApiClient::new(&server.uri(), Duration::from_secs(5)).expect("client");
        export(
            &client,
            &credentials(),
            RosterQuery::default(),
            None,
            &options(),
            out,
        )
        .await
    }

    #[tokio::test]
    async fn exports_projected_roster() {
        let server = MockServer::start().await;
        mount_token(&server, 200).await;
        mount_roster_page(
            &server,
            1,
            ResponseTemplate::new(200).set_body_json(serde_json::json!([
                student(1, true, true),
                student(2, false, true),
            ])),
        )
        .await;
        mount_roster_page(
            &server,
            2,
            ResponseTemplate::new(200).set_body_json(serde_json::json!([])),
        )
        .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("roster.json");

        let summary = run_export(&server, &out).await.expect("export");

        assert_eq!(summary.records, 2);
        assert_eq!(summary.requests, 2);
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).expect("read")).expect("json");
        assert_eq!(written[0]["login"], "cadet1");
        assert_eq!(written[0]["status"], "Alumni");
        assert_eq!(written[0]["name"], "Cadet 1");
        assert_eq!(written[1]["status"], "Active");
        assert!(written[1]["blackholed_at"].is_null());
    }

    #[tokio::test]
    async fn rerun_against_same_data_is_byte_identical() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "test-token" })),
            )
            .mount(&server)
            .await;
        mount_roster_page(
            &server,
            1,
            ResponseTemplate::new(200).set_body_json(serde_json::json!([student(5, false, false)])),
        )
        .await;
        mount_roster_page(
            &server,
            2,
            ResponseTemplate::new(200).set_body_json(serde_json::json!([])),
        )
        .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");

        run_export(&server, &first).await.expect("first run");
        run_export(&server, &second).await.expect("second run");

        assert_eq!(
            std::fs::read(&first).expect("first"),
            std::fs::read(&second).expect("second")
        );
    }

    #[tokio::test]
    async fn rejected_credentials_stop_before_collection_requests() {
        let server = MockServer::start().await;
        mount_token(&server, 401).await;

        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("roster.json");

        let err = run_export(&server, &out).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::Authentication { .. })
        ));
        assert_eq!(roster_requests(&server).await, 0);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn api_error_leaves_no_output_file() {
        let server = MockServer::start().await;
        mount_token(&server, 200).await;
        mount_roster_page(
            &server,
            1,
            ResponseTemplate::new(200).set_body_json(serde_json::json!([student(1, false, true)])),
        )
        .await;
        mount_roster_page(
            &server,
            2,
            ResponseTemplate::new(500).set_body_string("internal error"),
        )
        .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("roster.json");

        let err = run_export(&server, &out).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::Api { .. })
        ));
        assert!(!out.exists());
        assert_eq!(std::fs::read_dir(dir.path()).expect("dir").count(), 0);
    }

    #[tokio::test]
    async fn campus_name_overrides_campus_filter() {
        let server = MockServer::start().await;
        mount_token(&server, 200).await;
        Mock::given(method("GET"))
            .and(path("/v2/campus"))
            .and(query_param("page[number]", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 64, "name": "Singapore" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/campus"))
            .and(query_param("page[number]", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(ROSTER_PATH))
            .and(query_param("filter[campus_id]", "64"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Duration::from_secs(5)).expect("client");
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("roster.json");
        let query = RosterQuery {
            campus_id: 1,
            ..RosterQuery::default()
        };

        let summary = export(
            &client,
            &credentials(),
            query,
            Some("singapore"),
            &options(),
            &out,
        )
        .await
        .expect("export");

        assert_eq!(summary.records, 0);
        assert_eq!(std::fs::read_to_string(&out).expect("read"), "[]\n");
    }

    #[test]
    fn cli_parses_export_defaults() {
        let cli = Cli::try_parse_from(["fortytwo-cursus-export", "export"]).expect("cli");
        match cli.command {
            Commands::Export {
                out,
                page_size,
                page_delay_ms,
                level_range,
                ..
            } => {
                assert_eq!(out, PathBuf::from("42_cursus_users.json"));
                assert_eq!(page_size, 100);
                assert_eq!(page_delay_ms, 500);
                assert_eq!(level_range, "4,30");
            }
            Commands::Campuses { .. } => panic!("expected export"),
        }
        assert_eq!(cli.timeout_secs, 30);
    }
}
