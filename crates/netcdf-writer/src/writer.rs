//! NetCDF-4 output through the native netcdf library.
//!
//! Files are written to a hidden sibling of the destination and renamed into
//! place only after libnetcdf has closed them, so a path that exists always
//! holds a complete file.

use grib2_parser::MetaValue;
use hypercube::{ArrayData, Attributes, Table, Variable};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;
use tracing::{debug, info, warn};

use crate::error::{WriteError, WriteResult};
use crate::plan::{VariablePlan, WritePlan};
use crate::policy::EncodingPolicy;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code. This disables that output by
/// calling H5Eset_auto2 with null handlers. Safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Outcome of one successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub path: PathBuf,
    pub bytes: u64,
    pub variables: usize,
    /// Data variables stored with the policy's compression
    pub compressed_variables: Vec<String>,
}

/// Writes tables as NetCDF-4 files with one encoding policy.
#[derive(Debug, Clone)]
pub struct NetcdfWriter {
    policy: EncodingPolicy,
    overwrite: bool,
}

impl NetcdfWriter {
    pub fn new(policy: EncodingPolicy) -> Self {
        silence_hdf5_errors();
        Self {
            policy,
            overwrite: false,
        }
    }

    /// Replace existing output files instead of failing.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn policy(&self) -> &EncodingPolicy {
        &self.policy
    }

    /// Write `table` to `path`.
    ///
    /// On error the temporary file is removed and `path` is left as it was.
    pub fn write(&self, table: &Table, path: &Path) -> WriteResult<WriteReport> {
        let plan = WritePlan::new(table, &self.policy)?;
        if path.exists() && !self.overwrite {
            return Err(WriteError::AlreadyExists(path.to_path_buf()));
        }

        let temp_path = temp_sibling(path);
        if let Err(e) = write_netcdf(&temp_path, table, &plan) {
            remove_temp(&temp_path);
            return Err(e);
        }

        if let Err(e) = std::fs::rename(&temp_path, path) {
            remove_temp(&temp_path);
            return Err(e.into());
        }

        let bytes = std::fs::metadata(path)?.len();
        let report = WriteReport {
            path: path.to_path_buf(),
            bytes,
            variables: plan.variables.len(),
            compressed_variables: plan.compressed(),
        };
        info!(
            path = %path.display(),
            bytes = bytes,
            variables = report.variables,
            policy = %self.policy.name,
            "Wrote NetCDF file"
        );
        Ok(report)
    }
}

fn write_netcdf(path: &Path, table: &Table, plan: &WritePlan) -> WriteResult<()> {
    let mut file = netcdf::create(path)?;

    for (name, len) in table.dims() {
        file.add_dimension(name, *len)?;
    }
    for (key, value) in &table.attrs {
        file.add_attribute(key, attribute_value(value))?;
    }

    for var_plan in &plan.variables {
        let var = table
            .variable(&var_plan.name)
            .ok_or_else(|| WriteError::InvalidTable(format!("'{}' vanished", var_plan.name)))?;
        write_variable(&mut file, var_plan, var)?;
        debug!(variable = %var_plan.name, compressed = var_plan.compression.is_some(), "Wrote variable");
    }

    // Dropping the handle closes the file and flushes HDF5 buffers
    drop(file);
    Ok(())
}

fn write_variable(file: &mut netcdf::FileMut, plan: &VariablePlan, var: &Variable) -> WriteResult<()> {
    let name = plan.name.as_str();
    let dims: Vec<&str> = var.dims.iter().map(String::as_str).collect();

    match &var.data {
        ArrayData::F32(values) => {
            let mut nc_var = file.add_variable::<f32>(name, &dims)?;
            if let Some((level, shuffle)) = plan.compression {
                nc_var.set_compression(level, shuffle)?;
            }
            if !plan.is_coordinate {
                nc_var.set_fill_value(f32::NAN)?;
            }
            put_attributes(&mut nc_var, &var.attrs)?;
            nc_var.put_values(values, ..)?;
        }
        ArrayData::F64(values) => {
            let mut nc_var = file.add_variable::<f64>(name, &dims)?;
            if let Some((level, shuffle)) = plan.compression {
                nc_var.set_compression(level, shuffle)?;
            }
            put_attributes(&mut nc_var, &var.attrs)?;
            nc_var.put_values(values, ..)?;
        }
        ArrayData::I64(values) => {
            let mut nc_var = file.add_variable::<i64>(name, &dims)?;
            if let Some((level, shuffle)) = plan.compression {
                nc_var.set_compression(level, shuffle)?;
            }
            put_attributes(&mut nc_var, &var.attrs)?;
            nc_var.put_values(values, ..)?;
        }
        ArrayData::Str(values) => {
            let mut nc_var = file.add_string_variable(name, &dims)?;
            put_attributes(&mut nc_var, &var.attrs)?;
            if dims.is_empty() {
                if let Some(value) = values.first() {
                    nc_var.put_string(value, ..)?;
                }
            } else {
                for (i, value) in values.iter().enumerate() {
                    nc_var.put_string(value, [i])?;
                }
            }
        }
    }
    Ok(())
}

fn put_attributes(nc_var: &mut netcdf::VariableMut<'_>, attrs: &Attributes) -> WriteResult<()> {
    for (key, value) in attrs {
        nc_var.put_attribute(key, attribute_value(value))?;
    }
    Ok(())
}

fn attribute_value(value: &MetaValue) -> netcdf::AttributeValue {
    match value {
        MetaValue::Int(v) => (*v).into(),
        MetaValue::Float(v) => (*v).into(),
        MetaValue::Str(s) => s.clone().into(),
    }
}

/// Unique hidden sibling of `path` in the same directory, so the final
/// rename never crosses filesystems.
fn remove_temp(temp_path: &Path) {
    if let Err(cleanup) = std::fs::remove_file(temp_path) {
        if cleanup.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove temporary file");
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let pid = std::process::id();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.nc".to_string());

    path.with_file_name(format!(".{}.{}_{}.tmp", file_name, pid, count))
}
