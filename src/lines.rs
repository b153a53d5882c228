use std::io::BufRead;

/// Invalid UTF-8 is replaced, never rejected.
pub fn read_next_line<R: BufRead>(reader: &mut R) -> std::io::Result<Option<String>> {
    let mut buf = Vec::new();
    let bytes_read = reader.read_until(b'\n', &mut buf)?;

    if bytes_read == 0 {
        return Ok(None);
    }

    trim_line_break(&mut buf);
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

pub fn trim_line_break(line: &mut Vec<u8>) {
    if let Some(b'\n') = line.last().copied() {
        line.pop();
        if let Some(b'\r') = line.last().copied() {
            line.pop();
        }
    } else if matches!(line.last().copied(), Some(b'\r')) {
        line.pop();
    }
}
