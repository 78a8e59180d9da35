// Focus management for the settings panel

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFocus {
    #[default]
    Resolution,
    Vertical,
    Crf,
    Preset,
    Gpu,
    Threads,
    Fps,
}

impl SettingsFocus {
    pub fn next(&self) -> Self {
        match self {
            Self::Resolution => Self::Vertical,
            Self::Vertical => Self::Crf,
            Self::Crf => Self::Preset,
            Self::Preset => Self::Gpu,
            Self::Gpu => Self::Threads,
            Self::Threads => Self::Fps,
            Self::Fps => Self::Resolution, // Wrap around
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Self::Resolution => Self::Fps, // Wrap around
            Self::Vertical => Self::Resolution,
            Self::Crf => Self::Vertical,
            Self::Preset => Self::Crf,
            Self::Gpu => Self::Preset,
            Self::Threads => Self::Gpu,
            Self::Fps => Self::Threads,
        }
    }
}
