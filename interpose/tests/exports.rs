//! Drives the exported `MPI_*` entry points against a fake MPI library.
//!
//! The test re-runs itself as a child process: the child loads
//! `libfake_pmpi.so` (built by `build.rs`) into the global symbol scope, calls
//! every export with sentinel arguments, and checks each one arrived at the
//! matching `PMPI_*` function untouched. The parent plays `rapid` and reads the
//! summary line from the child's stdout.

#![cfg(feature = "mpich")]

mod common;

use anyhow::{bail, Context, Result};
use common::FakeDaemon;
use nix::sys::signal::{raise, Signal};
use rapi::mpi::bindings::{lookup, MPI_Request, MPI_Status, Pmpi};
use rapi::mpi::exports::*;
use rapi_shared::Request;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::process::{Command, Stdio};

const CHILD_ENV: &str = "RAPI_TEST_EXPORTS_CHILD";
const TEST_NAME: &str = "test_exports_forward_to_pmpi";

/// Calls the child makes between MPI_Init and MPI_Finalize.
const INTERCEPTED_CALLS: usize = 11;
const RESUMES: usize = 3;

const COMM_WORLD: c_int = 0x4400_0000;

/// Inspection hooks exported by the fake library.
struct FakeMpi {
    last_call: unsafe extern "C" fn() -> *const c_char,
    arg_count: unsafe extern "C" fn() -> c_int,
    arg: unsafe extern "C" fn(c_int) -> i64,
    rank_queries: unsafe extern "C" fn() -> c_int,
}

impl FakeMpi {
    fn load() -> Result<Self> {
        let Some(path) = option_env!("RAPI_FAKE_PMPI") else {
            bail!("fake PMPI library was not built; is a C compiler installed?");
        };
        let path = CString::new(path)?;
        // SAFETY: the fixture has no initializers.
        let handle = unsafe { libc::dlopen(path.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
        if handle.is_null() {
            bail!("dlopen {:?} failed", path);
        }

        // SAFETY: prototypes match tests/fixtures/fake_pmpi.c.
        unsafe {
            Ok(Self {
                last_call: lookup("fake_last_call\0")?,
                arg_count: lookup("fake_arg_count\0")?,
                arg: lookup("fake_arg\0")?,
                rank_queries: lookup("fake_rank_queries\0")?,
            })
        }
    }

    fn last_call(&self) -> String {
        // SAFETY: the fixture returns a static NUL-terminated string.
        unsafe { CStr::from_ptr((self.last_call)()) }
            .to_string_lossy()
            .into_owned()
    }

    fn args(&self) -> Vec<i64> {
        // SAFETY: plain reads of the fixture's recorded arguments.
        unsafe { (0..(self.arg_count)()).map(|i| (self.arg)(i)).collect() }
    }

    fn rank_queries(&self) -> c_int {
        unsafe { (self.rank_queries)() }
    }

    fn assert_forwarded(&self, ret: c_int, name: &str, status: c_int, args: &[i64]) {
        assert_eq!(ret, status, "{} status", name);
        assert_eq!(self.last_call(), name);
        assert_eq!(self.args(), args, "{} arguments", name);
    }
}

/// Sentinel pointer; neither the shim nor the fixture dereferences it.
fn ptr<T>(addr: usize) -> *mut T {
    addr as *mut T
}

fn run_child() -> Result<()> {
    let fake = FakeMpi::load()?;
    Pmpi::resolve().context("resolving PMPI entry points from the fake library")?;

    // SAFETY: every pointer below is a sentinel the fixture only records.
    unsafe {
        let ret = MPI_Init(ptr(0x1000), ptr(0x1008));
        fake.assert_forwarded(ret, "PMPI_Init", 0, &[0x1000, 0x1008]);

        for _ in 0..RESUMES {
            raise(Signal::SIGCONT)?;
        }

        let ret = MPI_Send(ptr::<c_void>(0x2000), 11, 12, 13, 14, COMM_WORLD);
        fake.assert_forwarded(
            ret,
            "PMPI_Send",
            6,
            &[0x2000, 11, 12, 13, 14, COMM_WORLD as i64],
        );

        let ret = MPI_Recv(ptr(0x3000), 21, 22, 23, 24, 25, ptr::<MPI_Status>(0x3008));
        fake.assert_forwarded(ret, "PMPI_Recv", 7, &[0x3000, 21, 22, 23, 24, 25, 0x3008]);

        let ret = MPI_Sendrecv(
            ptr::<c_void>(0x4000),
            31,
            32,
            33,
            34,
            ptr(0x4008),
            35,
            36,
            37,
            38,
            39,
            ptr::<MPI_Status>(0x4010),
        );
        fake.assert_forwarded(
            ret,
            "PMPI_Sendrecv",
            8,
            &[0x4000, 31, 32, 33, 34, 0x4008, 35, 36, 37, 38, 39, 0x4010],
        );

        let ret = MPI_Alltoall(ptr::<c_void>(0x5000), 41, 42, ptr(0x5008), 43, 44, 45);
        fake.assert_forwarded(ret, "PMPI_Alltoall", 9, &[0x5000, 41, 42, 0x5008, 43, 44, 45]);

        let ret = MPI_Wait(ptr::<MPI_Request>(0x6000), ptr::<MPI_Status>(0x6008));
        fake.assert_forwarded(ret, "PMPI_Wait", 10, &[0x6000, 0x6008]);

        let ret = MPI_Waitall(51, ptr::<MPI_Request>(0x7000), ptr::<MPI_Status>(0x7008));
        fake.assert_forwarded(ret, "PMPI_Waitall", 11, &[51, 0x7000, 0x7008]);

        let ret = MPI_Allreduce(ptr::<c_void>(0x8000), ptr(0x8008), 61, 62, 63, 64);
        fake.assert_forwarded(ret, "PMPI_Allreduce", 12, &[0x8000, 0x8008, 61, 62, 63, 64]);

        let ret = MPI_Barrier(71);
        fake.assert_forwarded(ret, "PMPI_Barrier", 13, &[71]);

        let ret = MPI_Bcast(ptr(0x9000), 81, 82, 83, 84);
        fake.assert_forwarded(ret, "PMPI_Bcast", 14, &[0x9000, 81, 82, 83, 84]);

        let ret = MPI_Reduce(ptr::<c_void>(0xa000), ptr(0xa008), 91, 92, 93, 94, 95);
        fake.assert_forwarded(
            ret,
            "PMPI_Reduce",
            15,
            &[0xa000, 0xa008, 91, 92, 93, 94, 95],
        );

        let ret = MPI_Allgather(ptr::<c_void>(0xb000), 101, 102, ptr(0xb008), 103, 104, 105);
        fake.assert_forwarded(
            ret,
            "PMPI_Allgather",
            17,
            &[0xb000, 101, 102, 0xb008, 103, 104, 105],
        );

        // A repeated init reaches the runtime, which reports the error itself.
        let ret = MPI_Init_thread(ptr(0xc000), ptr(0xc008), 3, ptr(0xc010));
        fake.assert_forwarded(
            ret,
            "PMPI_Init_thread",
            16,
            &[0xc000, 0xc008, 3, 0xc010],
        );

        let ret = MPI_Finalize();
        fake.assert_forwarded(ret, "PMPI_Finalize", 0, &[]);
    }
    assert_eq!(fake.rank_queries(), 1);
    Ok(())
}

#[test]
fn test_exports_forward_to_pmpi() -> Result<()> {
    if std::env::var_os(CHILD_ENV).is_some() {
        return run_child();
    }

    let daemon = FakeDaemon::bind()?;
    let child = Command::new(std::env::current_exe()?)
        .args(["--exact", TEST_NAME, "--test-threads=1", "--quiet"])
        .env(CHILD_ENV, "1")
        .env("RAPID_PORT", daemon.port().to_string())
        .env("RAPI_LOG", "off")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let pid = child.id() as i32;
    let output = child.wait_with_output()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "child failed: {}\nstdout:\n{}\nstderr:\n{}",
        output.status,
        stdout,
        String::from_utf8_lossy(&output.stderr)
    );

    let summary = stdout
        .lines()
        .map(|line| line.split(", ").collect::<Vec<_>>())
        .find(|fields| fields.len() == 4)
        .with_context(|| format!("no summary line in {:?}", stdout))?;
    assert_eq!(summary[0], "3");
    assert!(summary[1].parse::<f64>()? >= 0.0);
    assert!(summary[2].parse::<f64>()? >= 0.0);
    assert_eq!(summary[3], RESUMES.to_string());

    let requests = daemon.expect(2 * INTERCEPTED_CALLS + 2)?;
    assert_eq!(requests.first(), Some(&Request::register(pid)));
    assert_eq!(requests.last(), Some(&Request::unregister(pid)));
    for pair in requests[1..requests.len() - 1].chunks(2) {
        assert_eq!(pair, [Request::begin_comm(), Request::end_comm()]);
    }
    assert!(daemon.is_quiet()?);
    Ok(())
}
