use crate::cli::{Cli, Commands, EncodeArgs};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use vidscale::{config, engine, ui};

pub fn run(cli: Cli) {
    // Handle subcommands first
    if let Some(command) = cli.command {
        init_cli_tracing();
        match command {
            Commands::CheckFfmpeg => handle_check_ffmpeg(),
            Commands::CheckGpu => handle_check_gpu(),
            Commands::Probe { file } => handle_probe(file),
            Commands::Scan {
                directory,
                recursive,
            } => handle_scan(directory, recursive),
            Commands::DryRun {
                directory,
                recursive,
                encode,
            } => handle_dry_run(directory, recursive, encode),
            Commands::Scale {
                input,
                output,
                encode,
            } => handle_scale(input, output, encode),
            Commands::Batch {
                directory,
                output_dir,
                recursive,
                encode,
            } => handle_batch(directory, output_dir, recursive, encode),
            Commands::Join { files, output } => handle_join(files, output),
            Commands::InitConfig => handle_init_config(),
        }
        return;
    }

    // Determine startup behavior from CLI flags and config
    let config = config::Config::load().unwrap_or_default();

    let autostart = if cli.autostart {
        Some(true)
    } else if cli.no_autostart {
        Some(false)
    } else {
        None // Use config default
    };

    let scan_on_launch = if cli.scan {
        Some(true)
    } else if cli.no_scan {
        Some(false)
    } else {
        None // Use config default
    };

    // Launch TUI (default behavior). No fmt subscriber here: the dashboard
    // owns the terminal, so engine events go to vidscale.log instead.
    if let Err(e) = ui::run_ui_with_options(cli.directory, autostart, scan_on_launch, &config) {
        eprintln!("Error running UI: {}", e);
        process::exit(1);
    }
}

fn init_cli_tracing() {
    let level = if cfg!(feature = "dev-logging") {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Seed settings from config, then let command-line flags override
fn settings_from(config: &config::Config, args: &EncodeArgs) -> engine::EncodingSettings {
    let mut settings = config.encoding_settings();
    if let Some(label) = &args.resolution {
        match engine::Resolution::parse(label) {
            Some(resolution) => settings.set_resolution(resolution),
            None => {
                eprintln!("Unknown resolution '{label}', expected source, HD, FHD, or 4K");
                process::exit(2);
            }
        }
    }
    if let Some(crf) = args.crf {
        settings.crf = crf;
    }
    if let Some(preset) = &args.preset {
        settings.preset = preset.clone();
    }
    if args.gpu {
        settings.use_gpu = true;
    }
    if args.vertical {
        settings.vertical = true;
    }
    if let Some(threads) = args.threads {
        settings.threads = threads;
    }
    if let Some(fps) = args.fps {
        settings.fps = Some(fps);
    }
    settings
}

fn operation_context(config: &config::Config) -> engine::OperationContext {
    engine::OperationContext::new(
        config.process.grace_period(),
        config.process.progress_window,
    )
}

/// Single-line progress readout, rewritten in place
fn print_progress(snapshot: &engine::ProgressSnapshot) {
    match snapshot.progress_pct {
        Some(pct) => print!(
            "\r  {:5.1}%  frame {:>6}  {:5.1} fps  {:4.2}x ",
            pct,
            snapshot.frame,
            snapshot.fps_avg.unwrap_or(0.0),
            snapshot.speed.unwrap_or(0.0)
        ),
        None => print!(
            "\r  frame {:>6}  {:5.1} fps  {:6.1}s elapsed ",
            snapshot.frame,
            snapshot.fps_avg.unwrap_or(0.0),
            snapshot.elapsed_s
        ),
    }
    let _ = std::io::stdout().flush();
}

fn handle_check_ffmpeg() {
    match engine::ffmpeg_version() {
        Ok(version) => {
            println!("ffmpeg found: {}", version);
            match engine::ffprobe_version() {
                Ok(probe_version) => {
                    println!("ffprobe found: {}", probe_version);
                    process::exit(0);
                }
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn handle_check_gpu() {
    use engine::hardware;

    println!("=== NVENC Hardware Encoding Check ===\n");

    match hardware::detect_nvidia_gpu() {
        Some(model) => println!("NVIDIA GPU:     {}", model),
        None => println!("NVIDIA GPU:     not detected (nvidia-smi missing or no device)"),
    }
    println!(
        "ffmpeg encoder: {}",
        if hardware::nvenc_encoder_listed() {
            "h264_nvenc listed"
        } else {
            "h264_nvenc not listed"
        }
    );

    if hardware::check_nvenc_available() {
        println!("\nNVENC is ready; --gpu encodes will use h264_nvenc.");
    } else {
        println!("\nNVENC not usable; --gpu encodes fall back to libx264.");
    }
}

fn handle_probe(file: PathBuf) {
    match engine::probe_input_info(&file) {
        Ok(info) => {
            println!("Codec:      {}", info.codec.as_deref().unwrap_or("unknown"));
            println!(
                "Resolution: {}x{}{}",
                info.width,
                info.height,
                if info.is_vertical() { " (portrait)" } else { "" }
            );
            println!("FPS:        {:.3}", info.fps);
            match info.duration_s {
                Some(d) => println!("Duration:   {:.2} s", d),
                None => println!("Duration:   unknown"),
            }
            if let Some(frames) = info.total_frames() {
                println!("Frames:     ~{}", frames);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn handle_scan(directory: Option<PathBuf>, recursive: bool) {
    let dir = directory
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    println!("Scanning folder: {}", dir.display());

    let files = if recursive {
        engine::scan_recursive(&dir)
    } else {
        engine::scan(&dir)
    };
    for file in &files {
        println!("- {}", file.display());
    }
    println!("Total videos: {}", files.len());
}

fn handle_dry_run(directory: Option<PathBuf>, recursive: bool, encode: EncodeArgs) {
    let dir = directory
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    println!("Dry run: building ffmpeg commands for {}", dir.display());

    let config = config::Config::load().unwrap_or_default();
    let settings = settings_from(&config, &encode);

    let files = if recursive {
        engine::scan_recursive(&dir)
    } else {
        engine::scan(&dir)
    };
    if files.is_empty() {
        println!("No video files found in {}", dir.display());
        return;
    }

    let jobs = engine::build_job_queue(files, &settings, None);
    for job in &jobs {
        let args = engine::build_scale_args(&job.settings, &job.input_path, &job.output_path);
        println!("{}", engine::format_ffmpeg_cmd("ffmpeg", &args));
    }
}

fn handle_scale(input: PathBuf, output: Option<PathBuf>, encode: EncodeArgs) {
    let config = config::Config::load().unwrap_or_default();
    let settings = settings_from(&config, &encode);

    let output = output.unwrap_or_else(|| engine::derive_output_path(&input, &settings, None));
    let mut job = engine::EncodeJob::new(input, output, settings);
    let ctx = operation_context(&config);

    println!(
        "Scaling {} -> {}",
        job.input_path.display(),
        job.output_path.display()
    );
    let result = engine::encode_job(&mut job, &ctx, print_progress);
    println!();
    match result {
        Ok(()) => {
            println!("Encoded: {}", job.output_path.display());
            if job.used_cpu_fallback {
                println!("note: NVENC failed, the encode finished on the CPU");
            }
        }
        Err(e) => {
            eprintln!("Encoding failed: {e}");
            for line in &job.diagnostics {
                eprintln!("  {line}");
            }
            process::exit(1);
        }
    }
}

fn handle_batch(
    directory: PathBuf,
    output_dir: Option<PathBuf>,
    recursive: bool,
    encode: EncodeArgs,
) {
    let config = config::Config::load().unwrap_or_default();
    let settings = settings_from(&config, &encode);

    let files = if recursive {
        engine::scan_recursive(&directory)
    } else {
        engine::scan(&directory)
    };
    if files.is_empty() {
        eprintln!("No video files found in {}", directory.display());
        process::exit(0);
    }

    let mut jobs = engine::build_job_queue(files, &settings, output_dir.as_deref());
    let ctx = operation_context(&config);
    let total = jobs.len();
    println!("Processing {} videos from {}", total, directory.display());

    let mut completed = 0usize;
    let mut failed = 0usize;
    for (idx, job) in jobs.iter_mut().enumerate() {
        println!("[{}/{}] {}", idx + 1, total, job.input_path.display());
        let result = engine::encode_job(job, &ctx, print_progress);
        println!();
        match result {
            Ok(()) => {
                completed += 1;
                println!("  -> {}", job.output_path.display());
                if job.used_cpu_fallback {
                    println!("  note: NVENC failed, finished on CPU");
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("  failed: {e}");
            }
        }
    }

    println!("Done: {completed} completed, {failed} failed");
    if failed > 0 {
        process::exit(1);
    }
}

fn handle_join(files: Vec<PathBuf>, output: Option<PathBuf>) {
    let config = config::Config::load().unwrap_or_default();

    let output = output.unwrap_or_else(|| {
        let dir = files
            .first()
            .and_then(|f| f.parent())
            .unwrap_or(Path::new("."));
        engine::default_join_output(dir)
    });

    if let Err(e) = engine::verify_compatible(&files) {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    let mut job = engine::JoinJob::new(files, output);
    let ctx = operation_context(&config);

    let result = engine::join_job(&mut job, &ctx, print_progress);
    println!();
    match result {
        Ok(()) => println!(
            "Joined {} files into {}",
            job.inputs.len(),
            job.output_path.display()
        ),
        Err(e) => {
            eprintln!("Join failed: {e}");
            process::exit(1);
        }
    }
}

fn handle_init_config() {
    match config::Config::load() {
        Ok(cfg) => {
            match config::Config::config_path() {
                Ok(path) => println!("Config loaded successfully from {}", path.display()),
                Err(e) => println!("Config loaded, but config path unknown: {:#}", e),
            }
            println!("{:#?}", cfg);
        }
        Err(e) => {
            println!("Config missing or invalid: {:#}", e);
            println!("Creating default config...");

            let cfg = config::Config::default();
            if let Err(err) = cfg.save() {
                eprintln!("Failed to save default config: {:#}", err);
                process::exit(1);
            } else {
                match config::Config::config_path() {
                    Ok(path) => println!("Default config saved to {}", path.display()),
                    Err(e) => println!("Default config saved (path unknown): {:#}", e),
                }
            }
        }
    }
}
