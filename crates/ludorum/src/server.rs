//! Server builder and accept loop.

use std::sync::Arc;

use ludorum_engine::{DiceRoller, ThreadDice};
use ludorum_protocol::JsonCodec;
use ludorum_room::{DiceFactory, Persistence, Registry, RoomConfig};
use ludorum_session::Identity;
use ludorum_transport::WsListener;

use crate::handler::handle_connection;
use crate::LudorumError;

/// Shared state handed to every connection handler.
pub(crate) struct ServerState<I: Identity, P: Persistence> {
    pub(crate) registry: Arc<Registry<P>>,
    pub(crate) identity: I,
    pub(crate) codec: JsonCodec,
}

/// Builder for a Ludorum server.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use ludorum::prelude::*;
///
/// # struct MyIdentity;
/// # impl Identity for MyIdentity {
/// #     async fn resolve(&self, _token: &str) -> Result<UserProfile, SessionError> {
/// #         Err(SessionError::AuthFailed("no".into()))
/// #     }
/// # }
/// # async fn run() -> Result<(), LudorumError> {
/// let server = ServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(MyIdentity, Arc::new(NoPersistence))
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ServerBuilder {
    bind_addr: String,
    config: RoomConfig,
    dice_factory: Option<DiceFactory>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            config: RoomConfig::default(),
            dice_factory: None,
        }
    }

    /// Sets the listen address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Overrides the room configuration (rules, timers, eviction).
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the per-room dice source. Defaults to uniform thread
    /// RNG; scripted tests inject sequences here.
    pub fn dice_factory(mut self, factory: DiceFactory) -> Self {
        self.dice_factory = Some(factory);
        self
    }

    /// Binds the listener and assembles the server around the given
    /// identity and persistence ports.
    pub async fn build<I: Identity, P: Persistence>(
        self,
        identity: I,
        persistence: Arc<P>,
    ) -> Result<Server<I, P>, LudorumError> {
        let listener = WsListener::bind(&self.bind_addr).await?;
        let dice_factory = self
            .dice_factory
            .unwrap_or_else(|| Arc::new(|| Box::new(ThreadDice) as Box<dyn DiceRoller>));
        let registry = Registry::new(persistence, self.config, dice_factory);
        Ok(Server {
            listener,
            state: Arc::new(ServerState {
                registry,
                identity,
                codec: JsonCodec,
            }),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Ludorum server.
pub struct Server<I: Identity, P: Persistence> {
    listener: WsListener,
    state: Arc<ServerState<I, P>>,
}

impl<I: Identity, P: Persistence> Server<I, P> {
    /// The bound address (useful with port 0 in tests).
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, one handler task each.
    pub async fn run(self) -> Result<(), LudorumError> {
        tracing::info!("ludorum server running");
        loop {
            match self.listener.accept().await {
                Ok((sender, receiver, path)) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(error) =
                            handle_connection(sender, receiver, path, state).await
                        {
                            tracing::debug!(%error, "connection ended with error");
                        }
                    });
                }
                Err(error) => {
                    tracing::error!(%error, "accept failed");
                }
            }
        }
    }
}
