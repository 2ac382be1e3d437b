pub mod indicator_service;

pub use indicator_service::{
    CalculateOptions, IndicatorRequest, IndicatorService, IndicatorSnapshot, InstanceId, ServiceLimits,
    TimeSeriesPoint,
};
