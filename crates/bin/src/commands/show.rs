//! Show command - connection info and list sizes of one identity.

use multisession::store::SessionDocument;

use crate::backend::{backend_label, create_backend, open_collection};
use crate::cli::IdentityArgs;
use crate::output::{OutputFormat, or_missing, print_fields};

/// Run the show command
pub async fn run(
    args: &IdentityArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = create_backend(&args.backend_config).await?;
    let collection = open_collection(&args.backend_config, backend)?;
    let identity = args.identity();

    // Read without opening a session, which would create the document.
    let Some(stored) = collection.find_one(&identity.filter()).await? else {
        return Err(format!(
            "No session stored for api_id {} and phone {}",
            identity.api_id, identity.phone
        )
        .into());
    };
    let document = SessionDocument::from_document(&stored)?;
    let info = document.connection_info();
    let fingerprint = info
        .and_then(|info| info.auth_key())
        .map(|key| key.fingerprint());

    match format {
        OutputFormat::Human => {
            print_fields(&[
                ("Backend", backend_label(&args.backend_config)),
                ("API ID", identity.api_id.to_string()),
                ("Phone", identity.phone.clone()),
                ("DC", or_missing(info.and_then(|i| i.dc_id))),
                ("Server", or_missing(info.and_then(|i| i.server_address.as_deref()))),
                ("Port", or_missing(info.and_then(|i| i.port))),
                ("Auth key", or_missing(fingerprint)),
                ("Takeout", or_missing(info.and_then(|i| i.takeout_id))),
                ("Entities", document.entities.len().to_string()),
                ("Sent files", document.sent_files.len().to_string()),
                ("States", document.update_states.len().to_string()),
                ("Version", or_missing(document.version())),
            ]);
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "api_id": identity.api_id,
                "api_hash": identity.api_hash,
                "phone": identity.phone,
                "dc_id": info.and_then(|i| i.dc_id),
                "server_address": info.and_then(|i| i.server_address.clone()),
                "port": info.and_then(|i| i.port),
                "auth_key_fingerprint": fingerprint,
                "takeout_id": info.and_then(|i| i.takeout_id),
                "entities": document.entities.len(),
                "sent_files": document.sent_files.len(),
                "update_states": document.update_states.len(),
                "version": document.version(),
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }

    Ok(())
}
