use std::io::{self, BufRead, ErrorKind, Write};
use std::path::Path;

use anyhow::Result;
use securenest_contracts::chat::{parse_intent, Intent, SESSION_HELP_COMMANDS};
use securenest_contracts::runs::bom::write_bom;
use securenest_engine::{AnalysisClient, AppState, ImageSource, Session};

use crate::render;

#[derive(Debug, PartialEq)]
pub(crate) enum Flow {
    Continue(String),
    Quit,
}

/// Interactive loop over stdin. Returns when the user quits or input ends.
pub(crate) fn run_shell(session: &mut Session, client: &mut AnalysisClient) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    println!(
        "SecureNest session started ({} / {}). Type /help for commands.",
        client.service_name(),
        client.config().model
    );
    if !client.config().has_credential() {
        println!("Warning: no API key configured; analysis will fail until one is set.");
    }

    loop {
        print!("[{}] > ", session.state().tag());
        io::stdout().flush()?;

        line.clear();
        let read = match input.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        if intent.action == "analyze" && session.state().is_idle() && !session.images().is_empty()
        {
            println!("Analyzing {} image(s)...", session.images().len());
        }
        match handle_intent(&intent, session, client)? {
            Flow::Continue(output) => print!("{output}"),
            Flow::Quit => break,
        }
    }
    Ok(())
}

pub(crate) fn handle_intent(
    intent: &Intent,
    session: &mut Session,
    client: &mut AnalysisClient,
) -> Result<Flow> {
    let output = match intent.action.as_str() {
        "noop" => String::new(),
        "quit" => return Ok(Flow::Quit),
        "help" => format!("Commands: {}\n", SESSION_HELP_COMMANDS.join("  ")),
        "add_images" => add_images(session, &intent.arg_paths()),
        "remove_image" => {
            let id = intent.arg_str("id").unwrap_or_default();
            if id.is_empty() {
                "/remove requires an image id (see /list)\n".to_string()
            } else {
                match session.remove_image(id) {
                    Ok(true) => format!("Removed {id}.\n"),
                    Ok(false) => format!("No image with id {id}.\n"),
                    Err(err) => format!("{err}\n"),
                }
            }
        }
        "list_images" => render::render_images(session.images()),
        "show" => render::render_state(session),
        "analyze" => {
            if !session.state().is_idle() {
                format!(
                    "Cannot analyze while in {} state; use /dismiss or /reset first.\n",
                    session.state().tag()
                )
            } else if !session.analyze(client) {
                "Add at least one image before analyzing.\n".to_string()
            } else {
                render::render_state(session)
            }
        }
        "dismiss_error" => {
            if session.dismiss_error() {
                render::render_images(session.images())
            } else {
                "Nothing to dismiss.\n".to_string()
            }
        }
        "reset" => {
            if session.reset() {
                "Session reset.\n".to_string()
            } else {
                "Cannot reset while an analysis is running.\n".to_string()
            }
        }
        "export_bom" => {
            let path = intent.arg_str("path").unwrap_or("bom.json");
            export_bom(session, client, Path::new(path))?
        }
        "set_model" => {
            let model = intent.arg_str("model").unwrap_or_default().trim();
            if model.is_empty() {
                format!("Model: {}\n", client.config().model)
            } else {
                client.set_model(model);
                format!("Model set to {model}\n")
            }
        }
        "unknown" => format!(
            "Unknown command /{}. Type /help for commands.\n",
            intent.arg_str("command").unwrap_or_default()
        ),
        other => format!("Unsupported action {other}.\n"),
    };
    Ok(Flow::Continue(output))
}

fn add_images(session: &mut Session, paths: &[String]) -> String {
    if paths.is_empty() {
        return "/add requires at least one image path\n".to_string();
    }
    let mut out = String::new();
    let mut sources = Vec::new();
    for path in paths {
        match ImageSource::from_path(Path::new(path)) {
            Ok(source) => sources.push(source),
            Err(err) => out.push_str(&format!("Skipped {path}: {err:#}\n")),
        }
    }
    if sources.is_empty() {
        return out;
    }
    match session.add_images(sources) {
        Ok(ids) => out.push_str(&format!("Added {} image(s): {}\n", ids.len(), ids.join(", "))),
        Err(err) => out.push_str(&format!("{err}\n")),
    }
    out
}

fn export_bom(session: &Session, client: &AnalysisClient, path: &Path) -> Result<String> {
    let AppState::Results(plan) = session.state() else {
        return Ok("No plan to export yet; run /analyze first.\n".to_string());
    };
    write_bom(path, plan, Some(&bom_metadata(client)))?;
    Ok(format!("Exported bill of materials to {}\n", path.display()))
}

pub(crate) fn bom_metadata(client: &AnalysisClient) -> serde_json::Map<String, serde_json::Value> {
    let mut extra = serde_json::Map::new();
    extra.insert(
        "model".to_string(),
        serde_json::Value::String(client.config().model.clone()),
    );
    extra.insert(
        "service".to_string(),
        serde_json::Value::String(client.service_name().to_string()),
    );
    extra
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::Path;

    use image::{ImageFormat, Rgb, RgbImage};
    use securenest_contracts::chat::parse_intent;
    use securenest_engine::{AnalysisClient, AnalysisConfig, DryrunService, Session};
    use serde_json::Value;

    use super::{handle_intent, Flow};

    fn dryrun_client(with_key: bool) -> AnalysisClient {
        AnalysisClient::new(
            AnalysisConfig {
                api_key: with_key.then(|| "dryrun".to_string()),
                ..AnalysisConfig::default()
            },
            DryrunService,
        )
    }

    fn write_png(path: &Path) -> anyhow::Result<()> {
        let image = RgbImage::from_pixel(4, 4, Rgb([200, 180, 90]));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png)?;
        std::fs::write(path, bytes.into_inner())?;
        Ok(())
    }

    fn output(
        line: &str,
        session: &mut Session,
        client: &mut AnalysisClient,
    ) -> anyhow::Result<String> {
        match handle_intent(&parse_intent(line), session, client)? {
            Flow::Continue(text) => Ok(text),
            Flow::Quit => Ok("<quit>".to_string()),
        }
    }

    #[test]
    fn full_session_add_analyze_export_reset() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let front = temp.path().join("front door.png");
        let garage = temp.path().join("garage.png");
        write_png(&front)?;
        write_png(&garage)?;

        let mut session = Session::new();
        let mut client = dryrun_client(true);

        let added = output(
            &format!("/add \"{}\" \"{}\"", front.display(), garage.display()),
            &mut session,
            &mut client,
        )?;
        assert!(added.starts_with("Added 2 image(s)"), "{added}");

        let listing = output("/list", &mut session, &mut client)?;
        assert!(listing.contains("front door.png"));
        assert!(listing.contains("image/png"));

        let results = output("/analyze", &mut session, &mut client)?;
        assert!(results.contains("Security Assessment"));
        assert_eq!(session.state().tag(), "results");

        let blocked = output(
            &format!("/add {}", garage.display()),
            &mut session,
            &mut client,
        )?;
        assert!(blocked.contains("only be changed while idle"), "{blocked}");
        assert_eq!(session.images().len(), 2);

        let bom_path = temp.path().join("bom.json");
        let exported = output(
            &format!("/export \"{}\"", bom_path.display()),
            &mut session,
            &mut client,
        )?;
        assert!(exported.starts_with("Exported bill of materials"));
        let bom: Value = serde_json::from_str(&std::fs::read_to_string(&bom_path)?)?;
        assert_eq!(bom["service"], Value::from("dryrun"));
        assert_eq!(bom["items"].as_array().map(Vec::len), Some(4));

        assert_eq!(output("/reset", &mut session, &mut client)?, "Session reset.\n");
        assert!(session.images().is_empty());
        assert_eq!(session.state().tag(), "idle");
        Ok(())
    }

    #[test]
    fn missing_key_shows_error_then_dismiss_keeps_images() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let photo = temp.path().join("porch.png");
        write_png(&photo)?;

        let mut session = Session::new();
        let mut client = dryrun_client(false);
        output(&format!("/add {}", photo.display()), &mut session, &mut client)?;

        let failed = output("/analyze", &mut session, &mut client)?;
        assert!(failed.starts_with("Error: API key is missing"), "{failed}");
        assert!(output("/analyze", &mut session, &mut client)?.contains("Cannot analyze"));

        let dismissed = output("/dismiss", &mut session, &mut client)?;
        assert!(dismissed.contains("1 image(s) ready"));
        assert_eq!(session.images().len(), 1);
        Ok(())
    }

    #[test]
    fn analyze_without_images_is_refused() -> anyhow::Result<()> {
        let mut session = Session::new();
        let mut client = dryrun_client(true);
        let text = output("/analyze", &mut session, &mut client)?;
        assert_eq!(text, "Add at least one image before analyzing.\n");
        assert_eq!(session.state().tag(), "idle");
        Ok(())
    }

    #[test]
    fn remove_model_help_and_quit() -> anyhow::Result<()> {
        let mut session = Session::new();
        let mut client = dryrun_client(true);

        assert_eq!(
            output("/remove nope", &mut session, &mut client)?,
            "No image with id nope.\n"
        );
        assert_eq!(
            output("/model gemini-2.5-pro", &mut session, &mut client)?,
            "Model set to gemini-2.5-pro\n"
        );
        assert_eq!(client.config().model, "gemini-2.5-pro");
        assert!(output("/help", &mut session, &mut client)?.contains("/analyze"));
        assert!(output("/bogus", &mut session, &mut client)?.contains("Unknown command /bogus"));
        assert!(output("/export", &mut session, &mut client)?.starts_with("No plan to export"));
        assert_eq!(output("/quit", &mut session, &mut client)?, "<quit>");
        Ok(())
    }

    #[test]
    fn unreadable_paths_are_skipped() -> anyhow::Result<()> {
        let mut session = Session::new();
        let mut client = dryrun_client(true);
        let text = output("/add /no/such/file.jpg", &mut session, &mut client)?;
        assert!(text.starts_with("Skipped /no/such/file.jpg"));
        assert!(session.images().is_empty());
        Ok(())
    }
}
