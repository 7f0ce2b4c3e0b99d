use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use dotenvy::dotenv;
use serde_json::json;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

use shift_dispatch::config::EnvironmentConfig;
use shift_dispatch::database;
use shift_dispatch::middleware::cors::cors_middleware;
use shift_dispatch::routes;
use shift_dispatch::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🚚 Shift Dispatch - Motor de cobertura de turnos");
    info!("================================================");

    // Inicializar base de datos
    let pool = match database::create_pool(None).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };

    let config = EnvironmentConfig::from_env();
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app_state = AppState::new(pool, config);

    let app = Router::new()
        .route("/health", get(health_endpoint))
        .nest("/api/triggers", routes::trigger_routes::create_trigger_router())
        .nest("/api/assignment", routes::assignment_routes::create_assignment_router())
        .nest("/api/bid-window", routes::bidding_routes::create_bidding_router())
        .nest("/api/driver", routes::driver_routes::create_driver_router())
        .nest("/api/admin", routes::admin_routes::create_admin_router())
        .layer(cors_middleware())
        .with_state(app_state);

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("⏱️ Triggers idempotentes (la cadencia la pone el cron externo):");
    info!("   POST /api/triggers/generate-week - Generar schedule semanal");
    info!("   POST /api/triggers/confirmation-sweep - Recordatorios y auto-drops");
    info!("   POST /api/triggers/no-show-sweep - Detección de no-shows");
    info!("   POST /api/triggers/close-bid-windows - Cierre/resolución de ventanas");
    info!("   POST /api/triggers/daily-health - Evaluación diaria + snapshot");
    info!("   POST /api/triggers/weekly-health - Evaluación semanal de estrellas");
    info!("🚛 Acciones del conductor:");
    info!("   POST /api/assignment/:id/confirm - Confirmar turno");
    info!("   POST /api/assignment/:id/arrive - Registrar llegada");
    info!("   POST /api/assignment/:id/start - Registrar paquetes cargados");
    info!("   POST /api/assignment/:id/complete - Completar turno");
    info!("   POST /api/assignment/:id/cancel - Cancelar turno");
    info!("   PUT  /api/assignment/shift/:shift_id - Corregir paquetes (ventana de edición)");
    info!("💰 Mercado de bidding:");
    info!("   POST /api/bid-window/:window_id/bids - Pujar (competitive)");
    info!("   POST /api/bid-window/:window_id/claim - Claim (instant/emergency)");
    info!("👤 Conductores:");
    info!("   POST /api/driver - Alta de conductor");
    info!("   GET  /api/driver/:id - Obtener conductor");
    info!("   DELETE /api/driver/:id - Desactivar conductor");
    info!("   PUT  /api/driver/:id/preferences - Preferencias de días/rutas");
    info!("   GET  /api/driver/:id/health - Estado de salud");
    info!("   GET  /api/driver/:id/metrics - Métricas rodantes");
    info!("🛠️ Overrides de manager:");
    info!("   POST /api/admin/warehouse - Alta de warehouse");
    info!("   POST /api/admin/route - Alta de ruta");
    info!("   POST /api/admin/assignment/:id/reassign - Reasignación directa");
    info!("   POST /api/admin/assignment/:id/emergency-window - Forzar ventana de emergencia");
    info!("   POST /api/admin/driver/:driver_id/reinstate - Reinstalar tras hard-stop");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            anyhow::anyhow!(e)
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Health check simple
async fn health_endpoint() -> Json<serde_json::Value> {
    Json(json!({
        "service": "shift-dispatch",
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
