pub mod console;
pub mod file;

/// Both sinks are boxed so the subscriber type does not depend on the configured format.
pub type BoxedLayer<S> = Box<dyn tracing_subscriber::Layer<S> + Send + Sync + 'static>;
