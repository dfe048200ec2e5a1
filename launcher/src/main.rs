use std::process::ExitCode;

use anyhow::Result;
use launcher::Plan;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();

    let plan = match Plan::from_env() {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let code = plan.launch().await?;
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
