use curator_core::AppViewModel;

/// Incremental terminal renderer: new log lines are printed as they
/// arrive, the album card once per fetch, the status line when it changes.
pub(crate) struct Screen {
    last_status: String,
    log_len: usize,
    album_rendered: bool,
}

impl Screen {
    pub(crate) fn new() -> Self {
        Self {
            last_status: String::new(),
            log_len: 0,
            album_rendered: false,
        }
    }

    pub(crate) fn render(&mut self, view: &AppViewModel) {
        for entry in &view.log[self.log_len..] {
            println!("[{}] {}", entry.at, entry.line);
        }
        self.log_len = view.log.len();

        if let Some(album) = &view.album {
            if !self.album_rendered {
                println!("--- album ---");
                println!("title:    {}", album.name);
                println!("author:   {}", album.author);
                let tags = if album.tags.is_empty() {
                    "none".to_string()
                } else {
                    album.tags.join(", ")
                };
                println!("tags:     {tags}");
                println!("chapters: {}", album.chapter_count);
                if let Some(description) = &album.description {
                    println!("{description}");
                }
                println!("-------------");
                self.album_rendered = true;
            }
        } else {
            self.album_rendered = false;
        }

        if view.status_line != self.last_status && !view.status_line.is_empty() {
            println!("* {}", view.status_line);
            self.last_status.clone_from(&view.status_line);
        }
    }
}

pub(crate) fn banner() {
    println!("curator - album inspector and downloader");
    println!("type 'help' for commands");
}

pub(crate) fn help() {
    println!("commands:");
    println!("  parse <id or url>      fetch and show album metadata");
    println!("  download <id or url>   download the album with the configured pipeline");
    println!("  dir <path>             set the download directory");
    println!("  plugins                list known plugins and their state");
    println!("  plugin on <name>       enable a plugin with its default parameters");
    println!("  plugin off <name>      disable a plugin");
    println!("  show                   print the current options document");
    println!("  save                   write the options document to disk");
    println!("  quit                   exit");
}
