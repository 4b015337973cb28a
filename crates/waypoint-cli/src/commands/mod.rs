pub mod navigate;
pub mod resolve;
pub mod routes;

/// Print one JSON document per line
pub fn emit(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
