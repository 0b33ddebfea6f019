//! `knowbridge auth`: verify that an identity token can be obtained.

use knowbridge_config::AppConfig;
use knowbridge_remote::Authenticator;

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let auth = Authenticator::from_config(&config)?;

    match auth.acquire().await {
        Some(credential) => {
            println!("Auth token retrieved successfully");
            println!("   Source:  {}", credential.source());
            println!("   Token:   {}", credential.redacted());
            if let Some(expires_at) = credential.expires_at() {
                println!("   Expires: {}", expires_at.to_rfc3339());
            }
            Ok(())
        }
        None => {
            eprintln!("Failed to retrieve auth token");
            eprintln!();
            eprintln!("  Either set AUTH_TOKEN, run on a platform with a metadata server,");
            eprintln!("  or log in with: gcloud auth login");
            Err("no identity token available".into())
        }
    }
}
