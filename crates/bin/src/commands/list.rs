//! List command - shows every stored identity with its list sizes.

use multisession::SessionIdentity;
use multisession::backend::Document;
use multisession::store::SessionDocument;

use crate::backend::{create_backend, open_collection};
use crate::cli::ListArgs;
use crate::output::{OutputFormat, or_missing, print_table};

/// Run the list command
pub async fn run(args: &ListArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let backend = create_backend(&args.backend_config).await?;
    let collection = open_collection(&args.backend_config, backend)?;

    let mut sessions = Vec::new();
    for stored in collection.find(&Document::new()).await? {
        let Some(identity) = SessionIdentity::from_document(&stored) else {
            tracing::warn!("Skipping document without a session identity");
            continue;
        };
        let document = SessionDocument::from_document(&stored)?;
        sessions.push((identity, document));
    }

    match format {
        OutputFormat::Human => {
            if sessions.is_empty() {
                println!("No sessions found in {}.", collection.namespace());
                return Ok(());
            }

            let rows: Vec<Vec<String>> = sessions
                .iter()
                .map(|(identity, document)| {
                    vec![
                        identity.api_id.to_string(),
                        identity.phone.clone(),
                        or_missing(document.connection_info().and_then(|info| info.dc_id)),
                        document.entities.len().to_string(),
                        document.sent_files.len().to_string(),
                        document.update_states.len().to_string(),
                    ]
                })
                .collect();
            print_table(
                &["API ID", "PHONE", "DC", "ENTITIES", "FILES", "STATES"],
                &rows,
            );
        }
        OutputFormat::Json => {
            let entries: Vec<_> = sessions
                .iter()
                .map(|(identity, document)| {
                    serde_json::json!({
                        "api_id": identity.api_id,
                        "api_hash": identity.api_hash,
                        "phone": identity.phone,
                        "dc_id": document.connection_info().and_then(|info| info.dc_id),
                        "entities": document.entities.len(),
                        "sent_files": document.sent_files.len(),
                        "update_states": document.update_states.len(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string(&entries)?);
        }
    }

    Ok(())
}
