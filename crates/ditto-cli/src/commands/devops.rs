use ditto_api_models::{WhoAmI, routes};
use reqwest::Method;

use crate::cli::OutputFormat;
use crate::client::{AppContext, CliResult, classify_problem, read_json};
use crate::output::{format_whoami, print_json};

pub(crate) async fn handle_whoami(ctx: &AppContext, output: OutputFormat) -> CliResult<()> {
    let url = ctx.endpoint(routes::WHOAMI, &[])?;
    let response = ctx.send(ctx.request(Method::GET, url)).await?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let whoami: WhoAmI = read_json(response, "whoami").await?;
    match output {
        OutputFormat::Json => print_json(&whoami),
        OutputFormat::Table => {
            println!("{}", format_whoami(&whoami));
            Ok(())
        }
    }
}
