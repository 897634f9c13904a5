//! `intrigue server` - Start the HTTP backend server.

pub async fn run(host: String, port: u16, db_path: String) -> Result<(), String> {
    let config = intrigue_server::ServerConfig {
        host: host.clone(),
        port,
        db_path,
    };

    println!("Starting Intrigue server on {}:{}...", host, port);

    let addr = intrigue_server::start_server(config).await?;
    println!("Intrigue server listening on http://{}", addr);

    // Keep the process running until interrupted
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for Ctrl+C: {}", e))?;

    println!("\nShutting down...");
    Ok(())
}
