use serde_json::json;

use crate::auth::encode_credential;
use crate::cli::OutputFormat;

pub fn handle(user_id: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    if user_id.trim().is_empty() {
        anyhow::bail!("user id must not be empty");
    }

    let token = encode_credential(user_id);
    match output_format {
        OutputFormat::Json => println!("{}", json!({ "userId": user_id, "token": token })),
        OutputFormat::Text => println!("Authorization: Bearer {}", token),
    }
    Ok(())
}
