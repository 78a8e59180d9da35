// Settings panel option lists and dashboard tuning knobs

/// Target frame rates offered by the FPS field; 0 keeps the source rate
pub const FPS_CHOICES: &[u32] = &[0, 24, 25, 30, 50, 60, 120];

/// Upper bound for the worker-threads field; 0 lets ffmpeg decide
pub const MAX_THREADS: u32 = 32;

/// Samples kept for the CPU/RAM waveforms (two minutes at the 500ms refresh)
pub const METRICS_HISTORY: usize = 240;
