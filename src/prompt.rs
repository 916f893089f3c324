use std::io::{self, BufRead, Write};

const SEARCH_KEY_INTRO: &str = "\
SHODAN_API_KEY setup
   This key is used ONLY to talk to the Shodan API.
   It is not the same thing as an OpenAI key.

   To get one:
   1. Create an account at https://account.shodan.io/
   2. Open 'My Account' and copy your API Key.
";

const MODEL_KEY_INTRO: &str = "\
OPENAI_API_KEY setup
   This key is for the AI provider (OpenAI), NOT for Shodan.
   To get one:
   1. Go to https://platform.openai.com/
   2. Create an account if you do not have one.
   3. Generate a key at https://platform.openai.com/api-keys
";

/// Line-oriented interaction with the user.
pub trait Prompt {
    fn say(&mut self, text: &str) -> io::Result<()>;

    /// Show `question` and return the trimmed answer (empty on EOF).
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl Terminal<io::StdinLock<'static>, io::Stderr> {
    /// Prompts go to stderr so stdout only carries the report.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Prompt for Terminal<R, W> {
    fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

/// A key typed by the user and whether they asked to keep it.
#[derive(Debug)]
pub struct KeyEntry {
    pub key: String,
    pub persist: bool,
}

/// Accepts Spanish and English affirmatives.
pub fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "si" | "sí" | "y" | "yes"
    )
}

/// `None` when the user enters nothing.
pub fn ask_search_key(prompt: &mut dyn Prompt) -> io::Result<Option<KeyEntry>> {
    prompt.say(SEARCH_KEY_INTRO)?;
    let key = prompt.ask("Enter your SHODAN_API_KEY: ")?;
    if key.is_empty() {
        prompt.say("Cannot continue without a SHODAN_API_KEY.")?;
        return Ok(None);
    }
    let persist = is_yes(&prompt.ask("Save this SHODAN_API_KEY for future runs? (y/n): ")?);
    Ok(Some(KeyEntry { key, persist }))
}

/// `None` when the user declines AI assistance or enters no key.
pub fn ask_model_key(prompt: &mut dyn Prompt) -> io::Result<Option<KeyEntry>> {
    prompt.say("\nOptional: OpenAI integration for better translations")?;
    let wanted = prompt.ask("Use OpenAI to translate questions into Shodan queries? (y/n): ")?;
    if !is_yes(&wanted) {
        prompt.say("Heuristic mode without AI will be used.\n")?;
        return Ok(None);
    }

    prompt.say(MODEL_KEY_INTRO)?;
    let key = prompt.ask("Enter your OPENAI_API_KEY (leave empty to cancel): ")?;
    if key.is_empty() {
        prompt.say("OpenAI not configured. Heuristic mode will be used.\n")?;
        return Ok(None);
    }
    let persist = is_yes(&prompt.ask("Save this OPENAI_API_KEY for future runs? (y/n): ")?);
    Ok(Some(KeyEntry { key, persist }))
}
