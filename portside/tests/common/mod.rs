//! Shared fixtures for integration tests.

use std::net::TcpListener;

use portside::manager::PortReservationManager;
use portside::publish::MemoryPublisher;
use portside::PortRange;

/// A reservation manager whose resources are real localhost listeners.
///
/// Ports are captured through a [`MemoryPublisher`] so tests observe
/// publication without mutating the process environment.
pub struct SocketManagerFixture {
    pub manager: PortReservationManager<TcpListener>,
    pub publisher: MemoryPublisher,
}

/// Builds a socket-backed manager over `[min, max]`.
///
/// The create callback binds a real listener (and so genuinely holds the
/// port until release); the release callback just drops it.
#[allow(dead_code)]
pub fn socket_manager(min: u16, max: u16) -> SocketManagerFixture {
    let publisher = MemoryPublisher::default();
    let manager = PortReservationManager::new(
        PortRange::from_bounds(min, max).unwrap(),
        Box::new(|port| TcpListener::bind(("127.0.0.1", port.value())).map_err(Into::into)),
        Box::new(drop),
    )
    .with_publisher(Box::new(publisher.clone()));

    SocketManagerFixture { manager, publisher }
}
