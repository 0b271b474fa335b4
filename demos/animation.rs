//! Demo of playing a glTF animation with ossature
//!
//! Usage: `animation FILE [CLIP] [OPTIONS.yaml]`
//!
//! Plays the clip for a few simulated seconds and prints the skinning
//! matrix of every joint at each sample. Run with `RUST_LOG=info` to see
//! what the importer found.
use log::{error, info};
use ossature::{
    import::{gltf_file, ImportOptions},
    AnimationSet, Animator,
};
use std::{path::Path, sync::Arc};

const SIM_RATE: f32 = 1.0 / 30.0;
const SIM_STEPS: usize = 90;
const PRINT_EVERY: usize = 30;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let Some(file_path) = args.get(1) else {
        eprintln!("usage: animation FILE [CLIP] [OPTIONS.yaml]");
        return;
    };
    let options = match args.get(3) {
        Some(yaml) => match ImportOptions::from_yaml_file(Path::new(yaml)) {
            Ok(options) => options,
            Err(e) => {
                error!("Can't read options {:?}: {}", yaml, e);
                return;
            }
        },
        None => ImportOptions::default(),
    };

    let set = match gltf_file::load_scene(Path::new(file_path))
        .and_then(|scene| AnimationSet::from_scene(&scene, &options))
    {
        Ok(set) => Arc::new(set),
        Err(e) => {
            error!("Can't load {:?}: {}", file_path, e);
            return;
        }
    };
    let mut animator = match Animator::new(set) {
        Ok(animator) => animator,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    info!("clips={:?}", animator.clip_names());
    let result = match args.get(2) {
        Some(name) => animator.set_current_animation(name.as_str()),
        None => animator.set_current_animation(0),
    };
    if let Err(e) = result {
        error!("{}", e);
        return;
    }

    for step in 0..=SIM_STEPS {
        if step > 0 {
            // Failures are logged and the last pose is kept
            let _ = animator.advance(SIM_RATE);
        }
        if step % PRINT_EVERY == 0 {
            println!("t={:.3}", animator.current_time().unwrap_or(0.0));
            for (joint, m) in animator
                .set()
                .skeleton()
                .joints()
                .iter()
                .zip(animator.final_joint_matrices())
            {
                println!("  {:<16} {:?}", joint.name, m.as_slice());
            }
        }
    }
}
