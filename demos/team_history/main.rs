//! Team history API with validated request bodies
//!
//! Run with:
//!
//! ```sh
//! RUST_LOG=routeguard=debug,tower_http=debug cargo run --example team_history
//! ```
//!
//! Then try:
//!
//! ```sh
//! curl -i -X POST localhost:3000/teams -H 'content-type: application/json' \
//!     -d '{"name":"","founded":1700,"stadium":"Olympisch Stadion"}'
//! curl -i -X POST localhost:3000/seasons -H 'content-type: application/json' \
//!     -d '{"team":"Ajax","label":"1994-95","started_on":"1994/08/01","position":0}'
//! ```

use regex::Regex;
use routeguard::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct CreateTeam {
    name: String,
    founded: i32,
    stadium: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
struct CreateSeason {
    #[validate(length(min = 1, message = "team is required"))]
    team: String,
    #[validate(length(equal = 7, message = "label must look like 1994-95"))]
    label: String,
    started_on: String,
    #[validate(range(min = 1, max = 20, message = "position must be between 1 and 20"))]
    position: u8,
}

#[derive(Debug, Clone, Serialize)]
struct Team {
    name: String,
    founded: i32,
    stadium: Option<String>,
    seasons: Vec<CreateSeason>,
}

#[derive(Clone, Default)]
struct TeamStore {
    teams: Arc<RwLock<BTreeMap<String, Team>>>,
}

impl TeamStore {
    async fn exists(&self, name: &str) -> bool {
        self.teams.read().await.contains_key(&name.to_lowercase())
    }
}

fn team_rules(store: TeamStore) -> RuleSet<CreateTeam> {
    RuleSet::<CreateTeam>::new()
        .rule("Name", |t: &CreateTeam| t.name.as_str(), rules::not_empty::<str>())
        .rule("Name", |t: &CreateTeam| t.name.as_str(), rules::length::<str>(2, 64))
        .rule("Founded", |t: &CreateTeam| &t.founded, rules::min_value(1850))
        .rule("Founded", |t: &CreateTeam| &t.founded, rules::max_value(2100))
        .rule(
            "Stadium",
            |t: &CreateTeam| &t.stadium,
            rules::with_message(rules::required::<String>(), "'Stadium' is required for new teams."),
        )
        .rule_async("Name", |t: &CreateTeam| t.name.clone(), move |field: &str, name: String| {
            let store = store.clone();
            let field = field.to_string();
            async move {
                if store.exists(&name).await {
                    Err(format!("'{}' must be unique.", field))
                } else {
                    Ok(())
                }
            }
        })
}

/// Date and team checks for seasons, on top of the derived rules
fn season_rules(store: TeamStore) -> Result<impl Validator<CreateSeason>> {
    let label = Regex::new(r"^\d{4}-\d{2}$")?;
    Ok(validator_fn(move |season: CreateSeason| {
        let store = store.clone();
        let label = label.clone();
        async move {
            let mut result = DeriveValidator::<CreateSeason>::new().validate(&season).await;

            let label_format = rules::matches::<str>(label);
            if let Err(message) = label_format("label", season.label.as_str()) {
                result.push("label", message);
            }
            let date = rules::date_format::<str>("%Y-%m-%d");
            if let Err(message) = date("started_on", season.started_on.as_str()) {
                result.push("started_on", message);
            }
            if !season.team.is_empty() && !store.exists(&season.team).await {
                result.push("team", format!("team '{}' does not exist", season.team));
            }
            result
        }
    }))
}

async fn create_team(
    State(store): State<TeamStore>,
    Json(input): Json<CreateTeam>,
) -> (StatusCode, Json<Team>) {
    let team = Team {
        name: input.name,
        founded: input.founded,
        stadium: input.stadium,
        seasons: Vec::new(),
    };
    store
        .teams
        .write()
        .await
        .insert(team.name.to_lowercase(), team.clone());
    tracing::info!(team = %team.name, "Team created");
    (StatusCode::CREATED, Json(team))
}

async fn create_season(
    State(store): State<TeamStore>,
    Json(season): Json<CreateSeason>,
) -> impl IntoResponse {
    let mut teams = store.teams.write().await;
    match teams.get_mut(&season.team.to_lowercase()) {
        Some(team) => {
            team.seasons.push(season);
            (StatusCode::CREATED, Json(serde_json::to_value(&*team).unwrap_or_default()))
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "team not found"})),
        ),
    }
}

async fn list_teams(State(store): State<TeamStore>) -> Json<Vec<Team>> {
    Json(store.teams.read().await.values().cloned().collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("team_history=info,routeguard=debug")),
        )
        .init();

    let store = TeamStore::default();

    let mut builder = ServerBuilder::new();
    if let Ok(path) = std::env::var("TEAM_HISTORY_CONFIG") {
        builder = builder.with_config_file(&path)?;
    }

    builder
        .with_validator::<CreateTeam>(team_rules(store.clone()))
        .with_validator::<CreateSeason>(season_rules(store.clone())?)
        .validated_route::<CreateTeam>("/teams", post(create_team).with_state(store.clone()))
        .validated_route::<CreateSeason>("/seasons", post(create_season).with_state(store.clone()))
        .with_custom_routes(Router::new().route("/history", get(list_teams)).with_state(store))
        .serve()
        .await
}
