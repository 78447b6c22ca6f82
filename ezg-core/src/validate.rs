use crate::domain::{ExpectedKind, MeshFormat, Slot, UploadedFile};
use crate::error::{EzgError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(String),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Images are checked by declared media type, meshes by file name suffix.
pub fn validate(file: &UploadedFile, expected: ExpectedKind) -> Verdict {
    let ok = match expected {
        ExpectedKind::Png => file.mime.trim().eq_ignore_ascii_case("image/png"),
        ExpectedKind::Mesh(format) => format.matches_name(&file.name),
    };
    if ok {
        Verdict::Accept
    } else {
        Verdict::Reject(format!("expected {expected}"))
    }
}

/// Validate the image slot.
pub fn accept_image(file: &UploadedFile) -> Result<()> {
    match validate(file, ExpectedKind::Png) {
        Verdict::Accept => Ok(()),
        Verdict::Reject(reason) => Err(EzgError::Rejected {
            slot: Slot::Image,
            reason,
        }),
    }
}

/// Validate the mesh slot against every accepted format, returning the
/// format that matched.
pub fn accept_mesh(file: &UploadedFile, accepted: &[MeshFormat]) -> Result<MeshFormat> {
    let mut reasons = Vec::with_capacity(accepted.len());
    for &format in accepted {
        match validate(file, ExpectedKind::Mesh(format)) {
            Verdict::Accept => return Ok(format),
            Verdict::Reject(_) => reasons.push(ExpectedKind::Mesh(format).to_string()),
        }
    }
    let reason = if reasons.is_empty() {
        "no mesh format is accepted".to_string()
    } else {
        format!("expected {}", reasons.join(" or "))
    };
    Err(EzgError::Rejected {
        slot: Slot::Mesh,
        reason,
    })
}
