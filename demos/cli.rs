use std::env;

use meteofrance_wcs::Client;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 5 {
        eprintln!(
            "Usage:\n  cargo run --example cli -- <model_settings.json> <user_settings.json> <model> <data_type> [output_dir]\n\nExample (AROME 0.01deg, rain, latest run):\n  cargo run --example cli -- settings/model_settings.json settings/user_settings.json arome001 rain grib_files\n\nNotes:\n- This contacts the Météo-France public API; a valid API key must be present in the user settings.\n- The output directory is cleared before downloading."
        );
        std::process::exit(2);
    }

    let model_settings = &args[1];
    let user_settings = &args[2];
    let model = &args[3];
    let data_type = &args[4];
    let output_dir = args.get(5).cloned().unwrap_or_else(|| "grib_files".to_string());

    let client = match Client::from_settings_files(model_settings, user_settings, model) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("cannot create client: {e}");
            std::process::exit(1);
        }
    };

    println!("Status: {}", client.status());
    println!("Available data types: {:?}", client.data_types());

    let run_time = match client.latest_run(data_type) {
        Ok(Some(run_time)) => run_time,
        Ok(None) => {
            eprintln!("no {data_type} run published yet");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("run discovery failed: {e}");
            std::process::exit(1);
        }
    };
    println!("Latest {data_type} run: {run_time}");

    match client.download_run(data_type, &run_time, &output_dir) {
        Ok(artifact) => {
            println!(
                "Downloaded {files} files ({bytes} bytes) to {output_dir}",
                files = artifact.files.len(),
                bytes = artifact.size_bytes
            );
            println!("Run info: {}", artifact.metadata_path.display());
        }
        Err(e) => {
            eprintln!("download failed: {e}");
            eprintln!("Tip: a partially populated output directory is untrusted; re-run to start the run download over.");
            std::process::exit(1);
        }
    }
}
