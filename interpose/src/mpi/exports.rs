//! Exported MPI entry points
//!
//! Each symbol shadows the MPI function of the same name. Arguments go to the
//! matching `PMPI_*` function untouched and its status comes back untouched.

#![allow(non_snake_case)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::too_many_arguments)]

use super::bindings::{
    CommRankFn, MPI_Comm, MPI_Datatype, MPI_Op, MPI_Request, MPI_Status, Pmpi, MPI_SUCCESS,
};
use crate::config::ShimConfig;
use crate::error::fatal;
use crate::logging;
use crate::session::{intercept, runtime_finalize, runtime_init, Session};
use crate::transport::UdpNotifier;
use std::ffi::{c_char, c_int, c_void};
use std::sync::OnceLock;
use tracing::warn;

static PMPI: OnceLock<Pmpi> = OnceLock::new();
static SESSION: OnceLock<Session<UdpNotifier>> = OnceLock::new();

fn pmpi() -> &'static Pmpi {
    PMPI.get_or_init(|| Pmpi::resolve().unwrap_or_else(|err| fatal(err)))
}

/// Shared body of `MPI_Init` and `MPI_Init_thread`.
fn start(init: impl FnOnce() -> c_int) -> c_int {
    let config = ShimConfig::from_env().unwrap_or_else(|err| fatal(err));
    logging::init(&config.log_filter);
    runtime_init(&SESSION, config.notifier(), config.observed_signal, init)
        .unwrap_or_else(|err| fatal(err))
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Init(argc: *mut c_int, argv: *mut *mut *mut c_char) -> c_int {
    let pmpi = pmpi();
    start(|| (pmpi.init)(argc, argv))
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Init_thread(
    argc: *mut c_int,
    argv: *mut *mut *mut c_char,
    required: c_int,
    provided: *mut c_int,
) -> c_int {
    let pmpi = pmpi();
    start(|| (pmpi.init_thread)(argc, argv, required, provided))
}

/// Rank of this process in `comm`, or 0 when the runtime cannot tell.
unsafe fn world_rank(comm_rank: CommRankFn, comm: MPI_Comm) -> c_int {
    let mut rank: c_int = 0;
    let status = comm_rank(comm, &mut rank);
    if status != MPI_SUCCESS {
        warn!(status, "rank query failed, reporting rank 0");
        return 0;
    }
    rank
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Finalize() -> c_int {
    let pmpi = pmpi();
    let rank = || world_rank(pmpi.comm_rank, pmpi.comm_world());
    runtime_finalize(&SESSION, rank, || (pmpi.finalize)(), &mut std::io::stdout())
        .unwrap_or_else(|err| fatal(err))
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Send(
    buf: *const c_void,
    count: c_int,
    datatype: MPI_Datatype,
    dest: c_int,
    tag: c_int,
    comm: MPI_Comm,
) -> c_int {
    let pmpi = pmpi();
    intercept(&SESSION, || (pmpi.send)(buf, count, datatype, dest, tag, comm))
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Recv(
    buf: *mut c_void,
    count: c_int,
    datatype: MPI_Datatype,
    source: c_int,
    tag: c_int,
    comm: MPI_Comm,
    status: *mut MPI_Status,
) -> c_int {
    let pmpi = pmpi();
    intercept(&SESSION, || {
        (pmpi.recv)(buf, count, datatype, source, tag, comm, status)
    })
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Sendrecv(
    sendbuf: *const c_void,
    sendcount: c_int,
    sendtype: MPI_Datatype,
    dest: c_int,
    sendtag: c_int,
    recvbuf: *mut c_void,
    recvcount: c_int,
    recvtype: MPI_Datatype,
    source: c_int,
    recvtag: c_int,
    comm: MPI_Comm,
    status: *mut MPI_Status,
) -> c_int {
    let pmpi = pmpi();
    intercept(&SESSION, || {
        (pmpi.sendrecv)(
            sendbuf, sendcount, sendtype, dest, sendtag, recvbuf, recvcount, recvtype, source,
            recvtag, comm, status,
        )
    })
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Alltoall(
    sendbuf: *const c_void,
    sendcount: c_int,
    sendtype: MPI_Datatype,
    recvbuf: *mut c_void,
    recvcount: c_int,
    recvtype: MPI_Datatype,
    comm: MPI_Comm,
) -> c_int {
    let pmpi = pmpi();
    intercept(&SESSION, || {
        (pmpi.alltoall)(sendbuf, sendcount, sendtype, recvbuf, recvcount, recvtype, comm)
    })
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Wait(request: *mut MPI_Request, status: *mut MPI_Status) -> c_int {
    let pmpi = pmpi();
    intercept(&SESSION, || (pmpi.wait)(request, status))
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Waitall(
    count: c_int,
    array_of_requests: *mut MPI_Request,
    array_of_statuses: *mut MPI_Status,
) -> c_int {
    let pmpi = pmpi();
    intercept(&SESSION, || {
        (pmpi.waitall)(count, array_of_requests, array_of_statuses)
    })
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Allreduce(
    sendbuf: *const c_void,
    recvbuf: *mut c_void,
    count: c_int,
    datatype: MPI_Datatype,
    op: MPI_Op,
    comm: MPI_Comm,
) -> c_int {
    let pmpi = pmpi();
    intercept(&SESSION, || {
        (pmpi.allreduce)(sendbuf, recvbuf, count, datatype, op, comm)
    })
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Barrier(comm: MPI_Comm) -> c_int {
    let pmpi = pmpi();
    intercept(&SESSION, || (pmpi.barrier)(comm))
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Bcast(
    buffer: *mut c_void,
    count: c_int,
    datatype: MPI_Datatype,
    root: c_int,
    comm: MPI_Comm,
) -> c_int {
    let pmpi = pmpi();
    intercept(&SESSION, || (pmpi.bcast)(buffer, count, datatype, root, comm))
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Reduce(
    sendbuf: *const c_void,
    recvbuf: *mut c_void,
    count: c_int,
    datatype: MPI_Datatype,
    op: MPI_Op,
    root: c_int,
    comm: MPI_Comm,
) -> c_int {
    let pmpi = pmpi();
    intercept(&SESSION, || {
        (pmpi.reduce)(sendbuf, recvbuf, count, datatype, op, root, comm)
    })
}

#[no_mangle]
pub unsafe extern "C" fn MPI_Allgather(
    sendbuf: *const c_void,
    sendcount: c_int,
    sendtype: MPI_Datatype,
    recvbuf: *mut c_void,
    recvcount: c_int,
    recvtype: MPI_Datatype,
    comm: MPI_Comm,
) -> c_int {
    let pmpi = pmpi();
    intercept(&SESSION, || {
        (pmpi.allgather)(sendbuf, sendcount, sendtype, recvbuf, recvcount, recvtype, comm)
    })
}
