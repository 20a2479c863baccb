use super::DeviceRequest;
use crate::error::Result;

pub trait BasePipelineBuilder<M>: Sized {
    type Pipeline;

    type Options: std::fmt::Debug + Clone;

    fn options(&self) -> &Self::Options;

    fn device_request(&self) -> &DeviceRequest;

    fn create_model(options: Self::Options, device: candle_core::Device) -> Result<M>;

    fn construct_pipeline(model: M) -> Result<Self::Pipeline>;

    fn build(self) -> Result<Self::Pipeline> {
        let device = self.device_request().clone().resolve()?;

        tracing::info!(
            options = ?self.options(),
            device = ?device.location(),
            "loading model"
        );

        let model = Self::create_model(self.options().clone(), device)?;

        Self::construct_pipeline(model)
    }
}

pub struct StandardPipelineBuilder<Opts> {
    pub(crate) options: Opts,
    pub(crate) device_request: DeviceRequest,
}

impl<Opts> StandardPipelineBuilder<Opts> {
    pub fn new(options: Opts) -> Self {
        Self {
            options,
            device_request: DeviceRequest::Auto,
        }
    }
}

impl<Opts> StandardPipelineBuilder<Opts> {
    pub(crate) fn device_request_mut(&mut self) -> &mut DeviceRequest {
        &mut self.device_request
    }

    pub(crate) fn options_mut(&mut self) -> &mut Opts {
        &mut self.options
    }
}
