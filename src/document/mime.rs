use crate::utils::CoreError;

/// Cross-checks a declared MIME hint against a magic-number sniff of
/// the buffer, closing the same upload-spoofing gap the donor closes
/// in `DocumentService::validate_file_content`: a binary sniff (PE,
/// ELF, Mach-O, a shared library) is never acceptable no matter what
/// the caller declared.
pub fn sniff_and_validate(bytes: &[u8], declared_mime: &str) -> Result<(), CoreError> {
    let Some(sniffed) = infer::get(bytes) else {
        return Ok(());
    };

    if matches!(sniffed.matcher_type(), infer::MatcherType::Archive) && declared_mime != "application/epub+zip" {
        // zip-backed formats (docx/xlsx/epub) sniff as generic archives;
        // only reject when the declared hint isn't one of those.
        let zip_backed = matches!(
            declared_mime,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        if !zip_backed {
            return Err(CoreError::ValidationError(format!(
                "declared mime {declared_mime} does not match sniffed archive contents"
            )));
        }
    }

    let is_executable = matches!(
        sniffed.matcher_type(),
        infer::MatcherType::App | infer::MatcherType::Custom
    ) || matches!(sniffed.mime_type(), "application/x-executable" | "application/x-sharedlib" | "application/x-mach-binary" | "application/x-elf");

    if is_executable {
        return Err(CoreError::ValidationError(format!(
            "upload content sniffs as an executable ({}), refusing",
            sniffed.mime_type()
        )));
    }

    if sniffed.mime_type() == "application/pdf" && declared_mime != "application/pdf" {
        return Err(CoreError::ValidationError(format!(
            "declared mime {declared_mime} does not match sniffed pdf contents"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_elf_binary_regardless_of_declared_mime() {
        let mut elf = vec![0x7f, b'E', b'L', b'F'];
        elf.extend(std::iter::repeat(0u8).take(64));
        let result = sniff_and_validate(&elf, "text/plain");
        assert!(result.is_err());
    }

    #[test]
    fn accepts_plain_text_declared_as_plain_text() {
        let bytes = b"hello world".to_vec();
        assert!(sniff_and_validate(&bytes, "text/plain").is_ok());
    }
}
