//! Sample Grafana datasource folders and test cases.

use crate::client::TrackerClient;
use crate::error::Result;
use serde_json::{json, Map, Value};
use tracing::info;

/// Folders created by [`seed`], directly under the root folder.
pub const SAMPLE_FOLDERS: [&str; 3] =
    ["postgres datasource", "prometheus datasource", "abyss datasource"];

/// A sample test case.
#[derive(Debug, Clone, Copy)]
pub struct SampleCase {
    /// Folder the case belongs to.
    pub folder: &'static str,
    /// Test case name.
    pub name: &'static str,
    /// What the case verifies.
    pub description: &'static str,
    /// Steps in order.
    pub steps: &'static [&'static str],
}

impl SampleCase {
    /// The test case payload, without its folder.
    #[must_use]
    pub fn payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("name".into(), json!(self.name));
        payload.insert("description".into(), json!(self.description));
        payload.insert("steps".into(), json!(self.steps));
        payload
    }
}

/// Realistic Grafana datasource test cases.
pub const SAMPLE_CASES: &[SampleCase] = &[
    SampleCase {
        folder: "postgres datasource",
        name: "Datasource connection and Save & Test",
        description: "Verify Postgres datasource connects and health check passes in Configuration.",
        steps: &[
            "Navigate to Configuration → Data sources",
            "Click Add data source and select PostgreSQL",
            "Fill host, database, user, and SSL mode",
            "Click Save & Test",
            "Verify green banner 'Database Connection OK'",
        ],
    },
    SampleCase {
        folder: "postgres datasource",
        name: "Explore SQL query returns table",
        description: "Run a simple SQL query in Explore and confirm table result appears.",
        steps: &[
            "Open Explore from sidebar or dashboard panel",
            "Select PostgreSQL datasource",
            "Enter query: SELECT 1 AS value",
            "Click Run query",
            "Verify Table view shows one row with column 'value'",
        ],
    },
    SampleCase {
        folder: "postgres datasource",
        name: "Table panel with SQL and time column",
        description: "Add a table panel using Postgres query and optional time column for dashboard time range.",
        steps: &[
            "Create or edit a dashboard",
            "Add visualization → Table",
            "Set datasource to PostgreSQL",
            "Enter query with time column e.g. SELECT time, metric FROM series WHERE $__timeFilter(time)",
            "Apply and set dashboard time range",
            "Verify table renders with correct columns and rows",
        ],
    },
    SampleCase {
        folder: "postgres datasource",
        name: "Time series panel from Postgres query",
        description: "Build a time series graph from a Postgres query with time and value columns.",
        steps: &[
            "Add panel and choose Time series visualization",
            "Select PostgreSQL datasource",
            "Write query returning time column and at least one value column",
            "Map Format as: Time series in query options",
            "Apply and verify graph renders for current time range",
        ],
    },
    SampleCase {
        folder: "postgres datasource",
        name: "Dashboard variable from Postgres query",
        description: "Create a dropdown variable backed by a Postgres query and use it in a panel.",
        steps: &[
            "Edit dashboard → Variables → Add variable",
            "Set type to Query, datasource to PostgreSQL",
            "Enter query e.g. SELECT DISTINCT name FROM services",
            "Save and apply variable",
            "Add panel with query that uses variable (e.g. WHERE service = '$service')",
            "Change variable value and verify panel updates",
        ],
    },
    SampleCase {
        folder: "prometheus datasource",
        name: "Prometheus datasource connection",
        description: "Verify Prometheus URL and connection in Configuration.",
        steps: &[
            "Go to Configuration → Data sources",
            "Add data source → Prometheus",
            "Set URL (e.g. http://prometheus:9090) and access mode",
            "Click Save & Test",
            "Verify 'Data source is working'",
        ],
    },
    SampleCase {
        folder: "prometheus datasource",
        name: "Explore PromQL and switch instant/range",
        description: "Run PromQL in Explore and toggle between instant and range query.",
        steps: &[
            "Open Explore and select Prometheus",
            "Enter query e.g. up",
            "Click Run query, verify time series or table result",
            "Switch query type to Instant and run again",
            "Verify result matches instant query semantics",
        ],
    },
    SampleCase {
        folder: "prometheus datasource",
        name: "Time series panel with legend and time range",
        description: "Add a Prometheus-backed graph and check legend and time range behavior.",
        steps: &[
            "Add panel → Time series, datasource Prometheus",
            "Add query e.g. rate(http_requests_total[5m])",
            "Apply and verify graph renders",
            "Check legend shows series names and values",
            "Change dashboard time range and verify graph updates",
        ],
    },
    SampleCase {
        folder: "prometheus datasource",
        name: "Multiple queries and legend format",
        description: "Panel with several PromQL queries and custom legend format.",
        steps: &[
            "Add Time series panel with Prometheus",
            "Add two queries e.g. rate(a_total[5m]), rate(b_total[5m])",
            "Set Legend mode and format e.g. {{job}} - {{instance}}",
            "Apply and verify both series appear with formatted legend",
            "Toggle legend values (e.g. Last, Mean) and verify values update",
        ],
    },
    SampleCase {
        folder: "prometheus datasource",
        name: "Alert rule using Prometheus query",
        description: "Create an alert that evaluates a Prometheus expression.",
        steps: &[
            "Edit dashboard and add panel with Prometheus query",
            "Open panel → Alert tab → Create alert rule",
            "Set condition (e.g. WHEN last() OF query A IS ABOVE 1)",
            "Configure contact point and save",
            "Trigger condition if possible and verify notification or state change",
        ],
    },
    SampleCase {
        folder: "abyss datasource",
        name: "Abyss datasource connection and health",
        description: "Verify Abyss datasource configuration and health check.",
        steps: &[
            "Navigate to Configuration → Data sources",
            "Add or select Abyss datasource",
            "Fill required connection settings (URL, auth if any)",
            "Click Save & Test",
            "Verify success message or health indicator",
        ],
    },
    SampleCase {
        folder: "abyss datasource",
        name: "Explore query returns data",
        description: "Run a query in Explore and confirm result format.",
        steps: &[
            "Open Explore and select Abyss datasource",
            "Enter a valid query (e.g. default or example from docs)",
            "Click Run query",
            "Verify result appears as table or time series as expected",
        ],
    },
    SampleCase {
        folder: "abyss datasource",
        name: "Dashboard panel using Abyss query",
        description: "Add a panel that uses Abyss and responds to time range.",
        steps: &[
            "Create or edit dashboard, add new panel",
            "Set datasource to Abyss",
            "Configure query and visualization type",
            "Apply and set dashboard time range",
            "Verify panel renders and updates when time range changes",
        ],
    },
];

/// What [`seed`] created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Folders created.
    pub folders: usize,
    /// Test cases created.
    pub test_cases: usize,
}

/// Create the sample folders and test cases through `client`.
///
/// # Errors
///
/// Returns the first error the client reports.
pub async fn seed(client: &dyn TrackerClient) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for name in SAMPLE_FOLDERS {
        let folder = client.create_folder(name, None).await?;
        info!(folder = folder.code(), %name, "seeded folder");
        summary.folders += 1;
    }

    for case in SAMPLE_CASES {
        let created = client.create_test_case(case.folder, case.payload()).await?;
        info!(id = %created.id, folder = case.folder, name = case.name, "seeded test case");
        summary.test_cases += 1;
    }

    Ok(summary)
}
