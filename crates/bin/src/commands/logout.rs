//! Logout command - clears the stored connection info of one identity.

use multisession::DocumentSession;
use multisession::session::Session;

use crate::backend::{create_backend, open_collection, persist_backend};
use crate::cli::IdentityArgs;
use crate::output::OutputFormat;

/// Run the logout command
pub async fn run(
    args: &IdentityArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = create_backend(&args.backend_config).await?;
    let collection = open_collection(&args.backend_config, backend.clone())?;
    let identity = args.identity();

    let had_session = collection.find_one(&identity.filter()).await?.is_some();
    if had_session {
        let mut session = DocumentSession::open_with_backend(
            identity.clone(),
            backend.clone(),
            &args.backend_config.database,
            collection,
        )
        .await?;
        session.delete().await?;
        session.close().await?;
        persist_backend(&args.backend_config, &backend).await?;
    }

    match format {
        OutputFormat::Human => {
            if had_session {
                println!(
                    "Logged out api_id {} phone {}",
                    identity.api_id, identity.phone
                );
            } else {
                println!(
                    "No session stored for api_id {} phone {}",
                    identity.api_id, identity.phone
                );
            }
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "api_id": identity.api_id,
                "phone": identity.phone,
                "logged_out": had_session,
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }

    Ok(())
}
