//! MPI FFI bindings
//!
//! Handle types for the selected MPI ABI and the table of `PMPI_*` entry points
//! the shim delegates to. The table is resolved with `dlsym` at first use, so
//! neither the crate nor its tests link against libmpi.

#![allow(non_camel_case_types)]

use crate::error::RapiError;
use std::ffi::{c_char, c_int, c_void};

#[cfg(all(feature = "mpich", feature = "openmpi"))]
compile_error!("features `mpich` and `openmpi` are mutually exclusive");

#[cfg(not(any(feature = "mpich", feature = "openmpi")))]
compile_error!("enable one of the `mpich` or `openmpi` features");

/// MPICH and derivatives (Intel MPI, MVAPICH): integer handles.
#[cfg(feature = "mpich")]
mod abi {
    use std::ffi::c_int;

    pub type MPI_Comm = c_int;
    pub type MPI_Datatype = c_int;
    pub type MPI_Op = c_int;
    pub type MPI_Request = c_int;

    pub const MPI_COMM_WORLD: MPI_Comm = 0x4400_0000;
}

/// Open MPI: handles are pointers to library-internal structs.
#[cfg(feature = "openmpi")]
mod abi {
    use std::ffi::c_void;

    pub type MPI_Comm = *mut c_void;
    pub type MPI_Datatype = *mut c_void;
    pub type MPI_Op = *mut c_void;
    pub type MPI_Request = *mut c_void;
}

pub use abi::*;

/// Status every MPI implementation returns on success.
pub const MPI_SUCCESS: c_int = 0;

/// Only ever handled through pointers supplied by the caller.
#[repr(C)]
pub struct MPI_Status {
    _opaque: [u8; 0],
}

pub type InitFn = unsafe extern "C" fn(*mut c_int, *mut *mut *mut c_char) -> c_int;
pub type InitThreadFn =
    unsafe extern "C" fn(*mut c_int, *mut *mut *mut c_char, c_int, *mut c_int) -> c_int;
pub type FinalizeFn = unsafe extern "C" fn() -> c_int;
pub type CommRankFn = unsafe extern "C" fn(MPI_Comm, *mut c_int) -> c_int;
pub type SendFn =
    unsafe extern "C" fn(*const c_void, c_int, MPI_Datatype, c_int, c_int, MPI_Comm) -> c_int;
pub type RecvFn = unsafe extern "C" fn(
    *mut c_void,
    c_int,
    MPI_Datatype,
    c_int,
    c_int,
    MPI_Comm,
    *mut MPI_Status,
) -> c_int;
pub type SendrecvFn = unsafe extern "C" fn(
    *const c_void,
    c_int,
    MPI_Datatype,
    c_int,
    c_int,
    *mut c_void,
    c_int,
    MPI_Datatype,
    c_int,
    c_int,
    MPI_Comm,
    *mut MPI_Status,
) -> c_int;
/// Shared by `PMPI_Alltoall` and `PMPI_Allgather`.
pub type ExchangeFn = unsafe extern "C" fn(
    *const c_void,
    c_int,
    MPI_Datatype,
    *mut c_void,
    c_int,
    MPI_Datatype,
    MPI_Comm,
) -> c_int;
pub type WaitFn = unsafe extern "C" fn(*mut MPI_Request, *mut MPI_Status) -> c_int;
pub type WaitallFn = unsafe extern "C" fn(c_int, *mut MPI_Request, *mut MPI_Status) -> c_int;
pub type AllreduceFn = unsafe extern "C" fn(
    *const c_void,
    *mut c_void,
    c_int,
    MPI_Datatype,
    MPI_Op,
    MPI_Comm,
) -> c_int;
pub type ReduceFn = unsafe extern "C" fn(
    *const c_void,
    *mut c_void,
    c_int,
    MPI_Datatype,
    MPI_Op,
    c_int,
    MPI_Comm,
) -> c_int;
pub type BarrierFn = unsafe extern "C" fn(MPI_Comm) -> c_int;
pub type BcastFn = unsafe extern "C" fn(*mut c_void, c_int, MPI_Datatype, c_int, MPI_Comm) -> c_int;

/// The real implementations behind every intercepted entry point.
pub struct Pmpi {
    pub init: InitFn,
    pub init_thread: InitThreadFn,
    pub finalize: FinalizeFn,
    pub comm_rank: CommRankFn,
    pub send: SendFn,
    pub recv: RecvFn,
    pub sendrecv: SendrecvFn,
    pub alltoall: ExchangeFn,
    pub wait: WaitFn,
    pub waitall: WaitallFn,
    pub allreduce: AllreduceFn,
    pub barrier: BarrierFn,
    pub bcast: BcastFn,
    pub reduce: ReduceFn,
    pub allgather: ExchangeFn,
    comm_world: MPI_Comm,
}

// SAFETY: the table holds function pointers and the world communicator handle,
// both immutable and process-global in every MPI implementation.
unsafe impl Send for Pmpi {}
unsafe impl Sync for Pmpi {}

macro_rules! pmpi_symbol {
    ($name:literal) => {
        lookup(concat!($name, "\0"))
    };
}

impl Pmpi {
    /// Resolve every entry point from the already-loaded MPI library.
    pub fn resolve() -> Result<Self, RapiError> {
        // SAFETY: each symbol is cast to the prototype the MPI standard gives it.
        unsafe {
            Ok(Self {
                init: pmpi_symbol!("PMPI_Init")?,
                init_thread: pmpi_symbol!("PMPI_Init_thread")?,
                finalize: pmpi_symbol!("PMPI_Finalize")?,
                comm_rank: pmpi_symbol!("PMPI_Comm_rank")?,
                send: pmpi_symbol!("PMPI_Send")?,
                recv: pmpi_symbol!("PMPI_Recv")?,
                sendrecv: pmpi_symbol!("PMPI_Sendrecv")?,
                alltoall: pmpi_symbol!("PMPI_Alltoall")?,
                wait: pmpi_symbol!("PMPI_Wait")?,
                waitall: pmpi_symbol!("PMPI_Waitall")?,
                allreduce: pmpi_symbol!("PMPI_Allreduce")?,
                barrier: pmpi_symbol!("PMPI_Barrier")?,
                bcast: pmpi_symbol!("PMPI_Bcast")?,
                reduce: pmpi_symbol!("PMPI_Reduce")?,
                allgather: pmpi_symbol!("PMPI_Allgather")?,
                comm_world: comm_world()?,
            })
        }
    }

    /// `MPI_COMM_WORLD` for the selected ABI.
    pub fn comm_world(&self) -> MPI_Comm {
        self.comm_world
    }
}

#[cfg(feature = "mpich")]
unsafe fn comm_world() -> Result<MPI_Comm, RapiError> {
    Ok(MPI_COMM_WORLD)
}

/// Open MPI's `MPI_COMM_WORLD` is the address of a predefined object.
#[cfg(feature = "openmpi")]
unsafe fn comm_world() -> Result<MPI_Comm, RapiError> {
    lookup::<*mut c_void>("ompi_mpi_comm_world\0")
}

/// Find `name` (NUL-terminated) in the objects loaded after this one, falling
/// back to the global scope.
///
/// # Safety
///
/// `T` must be a pointer-sized type matching what the symbol really is.
pub unsafe fn lookup<T: Copy>(name: &'static str) -> Result<T, RapiError> {
    debug_assert!(name.ends_with('\0'));
    debug_assert_eq!(std::mem::size_of::<T>(), std::mem::size_of::<*mut c_void>());

    let symbol = name.as_ptr().cast::<c_char>();
    let mut ptr = libc::dlsym(libc::RTLD_NEXT, symbol);
    if ptr.is_null() {
        ptr = libc::dlsym(libc::RTLD_DEFAULT, symbol);
    }
    if ptr.is_null() {
        return Err(RapiError::MissingSymbol(name.trim_end_matches('\0')));
    }
    Ok(std::mem::transmute_copy::<*mut c_void, T>(&ptr))
}
