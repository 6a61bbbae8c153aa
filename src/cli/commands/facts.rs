//! `facts` - device identity and feature support

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use junos_engine::facts::{Feature, SystemInformation};
use serde::Serialize;

/// Arguments for the facts command
#[derive(Parser, Debug, Clone)]
pub struct FactsArgs {
    /// Only check this feature (security, chassis-cluster, router, switching)
    #[arg(long)]
    pub feature: Option<Feature>,
}

#[derive(Serialize)]
struct FactsReport<'a> {
    host: &'a str,
    system: Option<&'a SystemInformation>,
    features: Vec<(Feature, bool)>,
}

impl FactsArgs {
    /// Execute the facts command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let mut session = match ctx.open_session().await {
            Ok(session) => session,
            Err(e) => return Ok(ctx.fail(&e)),
        };

        let features: Vec<Feature> = match self.feature {
            Some(feature) => vec![feature],
            None => Feature::ALL.to_vec(),
        };
        let report = FactsReport {
            host: session.host(),
            system: session.system_information(),
            features: features
                .iter()
                .map(|f| (*f, session.check_compatibility(*f)))
                .collect(),
        };

        if ctx.output.is_json() {
            ctx.output.json(&report)?;
        } else {
            ctx.output.banner(&format!("FACTS: {}", report.host));
            match report.system {
                Some(info) => {
                    let rows = vec![
                        vec!["model".to_string(), info.hardware_model.clone()],
                        vec!["os".to_string(), format!("{} {}", info.os_name, info.os_version)],
                        vec![
                            "serial".to_string(),
                            info.serial_number.clone().unwrap_or_else(|| "-".to_string()),
                        ],
                        vec![
                            "host-name".to_string(),
                            info.host_name.clone().unwrap_or_else(|| "-".to_string()),
                        ],
                    ];
                    ctx.output.table(&["FIELD", "VALUE"], &rows);
                }
                None => ctx.output.warning("offline session: no device identity"),
            }
            println!();
            let rows: Vec<Vec<String>> = report
                .features
                .iter()
                .map(|(f, ok)| vec![f.to_string(), if *ok { "yes" } else { "no" }.to_string()])
                .collect();
            ctx.output.table(&["FEATURE", "SUPPORTED"], &rows);
        }

        if let Err(e) = session.close().await {
            return Ok(ctx.fail(&e));
        }
        Ok(0)
    }
}
