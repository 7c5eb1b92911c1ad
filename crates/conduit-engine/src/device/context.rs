use std::time::Duration;

use anyhow::{Context, Result};

use super::DeviceInit;

/// Owns the wgpu core objects shared by every offscreen component.
///
/// This type is the low-level rendering context:
/// - creates and stores Instance/Adapter/Device/Queue
/// - compiles shader modules with diagnostics
/// - drives device event processing (map callbacks, submission retirement)
///
/// Construction either fully succeeds or returns an error; there is no
/// partially initialized context.
pub struct DeviceContext {
    /// wgpu instance used to create the adapter.
    instance: wgpu::Instance,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,
}

impl DeviceContext {
    /// Creates a headless device context.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(init: DeviceInit) -> Result<Self> {
        let backends = init.resolved_backends();

        let DeviceInit {
            power_preference,
            force_fallback_adapter,
            required_features,
            required_limits,
            ..
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("conduit device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let info = adapter.get_info();
        log::info!(
            "device ready: {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Blocking variant of [`DeviceContext::new`].
    pub fn init(init: DeviceInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    /// Returns a reference to the instance.
    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns adapter identification.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Returns the backend the adapter runs on.
    pub fn backend(&self) -> wgpu::Backend {
        self.adapter.get_info().backend
    }

    /// Returns the limits granted to the device.
    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Compiles a WGSL shader module.
    ///
    /// The source is parsed and validated up front so that a compile failure
    /// comes back as an error carrying the compiler diagnostic instead of
    /// reaching wgpu's uncaptured-error handler.
    pub fn load_shader(&self, source: &str, name: &str) -> Result<wgpu::ShaderModule> {
        validate_wgsl(source).with_context(|| format!("shader `{name}` failed to compile"))?;

        Ok(self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(name),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            }))
    }

    /// Runs `create` inside a validation error scope.
    ///
    /// wgpu reports invalid objects asynchronously; outside a scope the
    /// report reaches the uncaptured-error handler, which panics. Here it
    /// comes back as an error naming `what`.
    pub fn validated<T>(&self, what: &str, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        match pollster::block_on(scope.pop()) {
            None => Ok(value),
            Some(err) => Err(anyhow::anyhow!("{what} is invalid: {err}")),
        }
    }

    /// Runs one non-blocking round of device event processing.
    ///
    /// Map callbacks and submission-done callbacks only fire from here.
    pub fn pump(&self) {
        if let Err(err) = self.device.poll(wgpu::PollType::Poll) {
            log::trace!("device poll: {err}");
        }
    }

    /// Pumps events for `iterations` rounds, sleeping `interval` between them.
    ///
    /// Used during teardown to let in-flight work retire. Always returns after
    /// the budget is spent, whether or not the queue went idle.
    pub fn drain(&self, iterations: u32, interval: Duration) {
        for _ in 0..iterations {
            self.pump();
            std::thread::sleep(interval);
        }
    }
}

/// Parses and validates WGSL, returning the diagnostic text on failure.
pub fn validate_wgsl(source: &str) -> Result<()> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| anyhow::anyhow!(err.emit_to_string(source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| anyhow::anyhow!("{}", err.as_inner()))?;

    Ok(())
}
