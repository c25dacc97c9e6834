pub mod stub;

#[cfg(feature = "backend-opencv")]
pub mod darknet;
#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::StubBackend;

#[cfg(feature = "backend-opencv")]
pub use darknet::DarknetBackend;
#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
