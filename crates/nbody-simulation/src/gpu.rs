//! Device selection, error scopes and host synchronization

use crate::error::{Result, SimulationError};
use nbody_physics::Float4;
use std::sync::mpsc;

/// Every adapter usable as a compute context, optionally restricted to those
/// that can present to `surface`.
pub fn enumerate_adapters(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> Vec<wgpu::Adapter> {
    instance
        .enumerate_adapters(wgpu::Backends::all())
        .into_iter()
        .filter(|adapter| surface.is_none_or(|s| adapter.is_surface_supported(s)))
        .collect()
}

/// Human readable adapter name for the HUD
pub fn adapter_label(info: &wgpu::AdapterInfo) -> String {
    format!("{} ({:?})", info.name, info.backend)
}

pub async fn open_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("N-Body Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        })
        .await?;
    Ok((device, queue))
}

/// Headless device for tests and benchmarks. Falls back to a software adapter.
pub fn headless_device() -> Option<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok()?;
    let (device, queue) = pollster::block_on(open_device(&adapter)).ok()?;
    Some((adapter, device, queue))
}

/// Run `build` with validation and out-of-memory errors captured instead of
/// reaching the device's uncaptured error handler.
///
/// Validation errors map to [`SimulationError::Pipeline`], out-of-memory to
/// [`SimulationError::Allocation`].
pub fn scoped<T>(
    device: &wgpu::Device,
    label: &'static str,
    build: impl FnOnce() -> T,
) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let value = build();

    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());

    if let Some(error) = out_of_memory {
        return Err(SimulationError::Allocation {
            label,
            message: error.to_string(),
        });
    }
    if let Some(error) = validation {
        return Err(SimulationError::Pipeline {
            label,
            message: error.to_string(),
        });
    }
    Ok(value)
}

/// Block until every submitted command buffer has finished executing.
pub fn drain(device: &wgpu::Device) -> Result<()> {
    device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: None,
    })?;
    Ok(())
}

/// Copy `size` bytes of `source` into host memory.
///
/// Blocks on the device; callers use it only for reseeding and context
/// migration, never per frame.
pub fn read_float4s(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    size: u64,
) -> Result<Vec<Float4>> {
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    drain(device)?;

    // The callback always fires during a blocking poll.
    rx.recv().map_err(|_| SimulationError::Readback(wgpu::BufferAsyncError))??;

    let values = {
        let data = slice.get_mapped_range();
        bytemuck::cast_slice::<u8, Float4>(&data).to_vec()
    };
    staging.unmap();
    Ok(values)
}
