//! Switchyard: an HTTP request-dispatch and middleware engine.

pub mod binding;
pub mod config;
pub mod context;
pub mod events;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resource;
pub mod routing;
pub mod services;

pub use config::ServerConfig;
pub use context::{Context, Entity, EntityError, Handler, HandlerResult, Params};
pub use events::{Event, EventBus, EventError, EventObserver};
pub use http::{HttpError, HttpServer};
pub use lifecycle::{App, AppBuilder, Shutdown};
pub use resource::{Data, ResourceOption};
pub use routing::{Group, Registrar, Route, RouteError, Router};
pub use services::{ServiceError, Services};
