mod half_open;
mod thresholds;
