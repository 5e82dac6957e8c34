//! Domain layer: descriptors, parameter specs, outcomes.
//!
//! Everything here is plain data plus the [`UseCase`] seam.  There is no I/O
//! and no knowledge of any serving runtime.

pub mod descriptor;
pub mod outcome;
pub mod parameter;
pub mod path;

pub use descriptor::{
    use_case_fn, FnUseCase, HttpMethod, HttpTrigger, SocketTrigger, TriggerDescriptor,
    UnknownMethod, UseCase, UseCaseDescriptor, DEFAULT_NAMESPACE, ERROR_EVENT,
};
pub use outcome::{Failure, FailureKind, Outcome};
pub use parameter::{ParamSource, ParamType, ParameterSpec, ResolvedInput};
pub use path::{PathError, PathTemplate};

#[cfg(test)]
pub use descriptor::MockUseCase;
