//! MPI interposition
//!
//! Build the `cdylib` and load it ahead of libmpi (`LD_PRELOAD=librapi.so` or
//! link order). The exported `MPI_*` symbols then shadow the library's, and the
//! real work is done through the standard `PMPI_*` profiling interface.

pub mod bindings;
pub mod exports;
