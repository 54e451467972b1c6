//! Pure bitstream/extradata conversions between Annex-B and length-prefixed
//! (AVCC/HVCC) NAL unit encodings, and between raw AV1 OBUs and the av1C
//! configuration record. No FFmpeg or host-runtime types involved: these are
//! plain byte-slice transforms, reused verbatim by the muxers/demuxers and by
//! the encoder/decoder pipelines when a backend's native bitstream format
//! doesn't match what the container or the caller's `avc.format`/`hevc.format`
//! option requests.

/// Convert H.264/H.265 Annex B format to AVCC/HVCC format (length-prefixed NALUs)
///
/// Annex B uses start codes (0x00000001 or 0x000001) to delimit NAL units.
/// AVCC/HVCC uses 4-byte big-endian length prefixes instead.
///
/// This function scans for start codes and replaces them with the NAL unit length.
pub fn convert_annexb_to_avcc(data: &[u8]) -> Vec<u8> {
  if data.is_empty() {
    return Vec::new();
  }

  // Find all NAL unit boundaries (positions after start codes)
  let mut nal_starts: Vec<usize> = Vec::new();
  let mut i = 0;

  while i < data.len() {
    // Look for 3-byte or 4-byte start code
    if i + 3 <= data.len() && data[i] == 0 && data[i + 1] == 0 {
      if data[i + 2] == 1 {
        // 3-byte start code: 0x000001
        nal_starts.push(i + 3);
        i += 3;
        continue;
      } else if i + 4 <= data.len() && data[i + 2] == 0 && data[i + 3] == 1 {
        // 4-byte start code: 0x00000001
        nal_starts.push(i + 4);
        i += 4;
        continue;
      }
    }
    i += 1;
  }

  if nal_starts.is_empty() {
    // No start codes found - might already be in AVCC format or invalid data
    return data.to_vec();
  }

  // Build AVCC output
  let mut result = Vec::with_capacity(data.len());

  for (idx, &start) in nal_starts.iter().enumerate() {
    // Find the end of this NAL unit (start of next, or end of data)
    let end = if idx + 1 < nal_starts.len() {
      // Find where the next start code begins (scan backwards from next NAL start)
      let next_nal_start = nal_starts[idx + 1];
      // The start code is either 3 or 4 bytes before next_nal_start
      if next_nal_start >= 4 && data[next_nal_start - 4] == 0 && data[next_nal_start - 3] == 0 {
        next_nal_start - 4 // 4-byte start code
      } else {
        next_nal_start - 3 // 3-byte start code
      }
    } else {
      data.len()
    };

    let nal_data = &data[start..end];
    let nal_len = nal_data.len() as u32;

    // Write 4-byte big-endian length prefix
    result.extend_from_slice(&nal_len.to_be_bytes());
    // Write NAL unit data
    result.extend_from_slice(nal_data);
  }

  result
}

/// Convert AVCC/HVCC format (length-prefixed NALUs) to Annex B format
///
/// AVCC uses 4-byte big-endian length prefixes to delimit NAL units.
/// Annex B uses start codes (0x00000001) instead.
///
/// This function parses length-prefixed NALUs and converts to start code format.
pub fn convert_avcc_to_annexb(data: &[u8]) -> Vec<u8> {
  if data.len() < 4 {
    return data.to_vec();
  }

  // Check if this looks like AVCC format by trying to parse it
  // AVCC format has 4-byte BE length prefixes
  let mut result = Vec::with_capacity(data.len() + 16); // Some extra for start codes
  let mut i = 0;

  while i + 4 <= data.len() {
    // Read 4-byte big-endian length
    let nal_len = u32::from_be_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]) as usize;

    // Sanity check: length should be reasonable
    if nal_len == 0 || nal_len > data.len() - i - 4 {
      // Not valid AVCC format, might already be Annex B - return as-is
      return data.to_vec();
    }

    i += 4; // Skip length prefix

    // Write 4-byte start code
    result.extend_from_slice(&[0, 0, 0, 1]);
    // Write NAL unit data
    result.extend_from_slice(&data[i..i + nal_len]);

    i += nal_len;
  }

  // If we didn't consume all data or didn't produce any output, return original
  if result.is_empty() || (i != data.len() && i < 4) {
    return data.to_vec();
  }

  result
}

/// Check if data looks like AVCC format (length-prefixed NALUs)
/// Returns true if the data appears to be in AVCC format
pub fn is_avcc_format(data: &[u8]) -> bool {
  if data.len() < 5 {
    return false;
  }

  // Check for definite Annex B 4-byte start code (0x00000001)
  // This is unambiguous - AVCC would never have a length of exactly 1
  if data[0] == 0 && data[1] == 0 && data[2] == 0 && data[3] == 1 {
    return false; // Definitely Annex B
  }

  // Check if first 4 bytes look like a reasonable NALU length
  let nal_len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;

  // NALU length should be > 0 and fit within remaining data
  if nal_len == 0 || nal_len > data.len() - 4 {
    return false;
  }

  // For ambiguous case (could be 3-byte start code 00 00 01):
  // Check if data[3] is part of length or a NAL header
  // If 00 00 01 XX where XX is a valid NAL header AND length doesn't make sense, it's Annex B
  if data[0] == 0 && data[1] == 0 && data[2] == 1 {
    // This could be 3-byte Annex B (00 00 01 <NAL>) or AVCC with length 0x000001XX
    // Check if interpreting as AVCC makes sense:
    // - The 5th byte (data[4]) should be a valid NAL header
    // - The length (0x000001XX) should match data structure

    let nal_header_if_annexb = data[3]; // NAL header if this is Annex B
    let nal_header_if_avcc = data[4]; // NAL header if this is AVCC

    // Check if Annex B interpretation is valid (data[3] is valid NAL header)
    let annexb_forbidden_bit = (nal_header_if_annexb >> 7) & 1;
    let annexb_nal_type = nal_header_if_annexb & 0x1F;
    let annexb_valid = annexb_forbidden_bit == 0 && annexb_nal_type <= 23 && annexb_nal_type > 0;

    // Check if AVCC interpretation is valid (data[4] is valid NAL header)
    let avcc_forbidden_bit = (nal_header_if_avcc >> 7) & 1;
    let avcc_nal_type = nal_header_if_avcc & 0x1F;
    let avcc_valid = avcc_forbidden_bit == 0 && avcc_nal_type <= 23 && avcc_nal_type > 0;

    // If only AVCC interpretation is valid, it's AVCC
    if avcc_valid && !annexb_valid {
      return true;
    }
    // If only Annex B interpretation is valid, it's Annex B
    if annexb_valid && !avcc_valid {
      return false;
    }
    // If both are valid, prefer AVCC if length exactly matches data
    if avcc_valid && annexb_valid {
      // AVCC is more likely if the length exactly consumes remaining data
      // For a single NAL chunk: nal_len + 4 == data.len()
      if nal_len + 4 == data.len() {
        return true;
      }
      // For multi-NAL chunk, try parsing multiple NALs
      let mut offset = 0;
      let mut valid_multi_nal = true;
      while offset + 4 <= data.len() {
        let len = u32::from_be_bytes([
          data[offset],
          data[offset + 1],
          data[offset + 2],
          data[offset + 3],
        ]) as usize;
        if len == 0 || offset + 4 + len > data.len() {
          valid_multi_nal = false;
          break;
        }
        offset += 4 + len;
      }
      if valid_multi_nal && offset == data.len() {
        return true;
      }
      // Default to Annex B for ambiguous cases
      return false;
    }
  }

  // For non-ambiguous cases, check if the 5th byte is a valid NAL header
  let nal_header = data[4];
  let h264_nal_type = nal_header & 0x1F;
  let h264_forbidden_bit = (nal_header >> 7) & 1;

  // For H.264, forbidden_zero_bit must be 0 and NAL type should be valid (1-23)
  if h264_forbidden_bit == 0 && h264_nal_type > 0 && h264_nal_type <= 23 {
    return true;
  }

  // Could be H.265 - check differently
  // H.265: forbidden_zero_bit (1) + nal_unit_type (6) + nuh_layer_id (6) + nuh_temporal_id_plus1 (3)
  let h265_forbidden_bit = (nal_header >> 7) & 1;
  h265_forbidden_bit == 0
}

/// Convert H.264 Annex B extradata (SPS/PPS with start codes) to avcC box format
///
/// avcC format (AVCDecoderConfigurationRecord) per ISO/IEC 14496-15:
/// - configurationVersion (1 byte) = 1
/// - AVCProfileIndication (1 byte) - from SPS profile_idc
/// - profile_compatibility (1 byte) - from SPS constraint_set flags
/// - AVCLevelIndication (1 byte) - from SPS level_idc
/// - lengthSizeMinusOne (6 bits reserved=1, 2 bits) = 0xFF (4-byte NALU lengths)
/// - numOfSequenceParameterSets (3 bits reserved=1, 5 bits count)
/// - sequenceParameterSetLength (2 bytes BE) + SPS data (for each SPS)
/// - numOfPictureParameterSets (1 byte)
/// - pictureParameterSetLength (2 bytes BE) + PPS data (for each PPS)
pub fn convert_annexb_extradata_to_avcc(data: &[u8]) -> Option<Vec<u8>> {
  if data.is_empty() {
    return None;
  }

  // Parse NAL units from Annex B format
  let mut sps_list: Vec<&[u8]> = Vec::new();
  let mut pps_list: Vec<&[u8]> = Vec::new();
  let mut i = 0;

  while i < data.len() {
    // Find start code (0x000001 or 0x00000001)
    let mut start_code_len = 0;
    if i + 4 <= data.len()
      && data[i] == 0
      && data[i + 1] == 0
      && data[i + 2] == 0
      && data[i + 3] == 1
    {
      start_code_len = 4;
    } else if i + 3 <= data.len() && data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
      start_code_len = 3;
    }

    if start_code_len > 0 {
      let nal_start = i + start_code_len;

      // Find end of this NAL (next start code or end of data)
      let mut nal_end = data.len();
      let mut j = nal_start;
      while j < data.len() {
        // Check for 4-byte start code (00 00 00 01) or 3-byte start code (00 00 01)
        let is_4byte_start = j + 4 <= data.len()
          && data[j] == 0
          && data[j + 1] == 0
          && data[j + 2] == 0
          && data[j + 3] == 1;
        let is_3byte_start =
          j + 3 <= data.len() && data[j] == 0 && data[j + 1] == 0 && data[j + 2] == 1;
        if is_4byte_start || is_3byte_start {
          nal_end = j;
          break;
        }
        j += 1;
      }

      if nal_start < nal_end {
        let nal_type = data[nal_start] & 0x1F;
        match nal_type {
          7 => sps_list.push(&data[nal_start..nal_end]), // SPS
          8 => pps_list.push(&data[nal_start..nal_end]), // PPS
          _ => {}                                        // Skip other NAL types
        }
      }
      i = nal_end;
    } else {
      i += 1;
    }
  }

  // Need at least one SPS and one PPS
  if sps_list.is_empty() || pps_list.is_empty() {
    return None;
  }

  // Extract profile/level from first SPS
  // SPS structure: nal_unit_type (1 byte), profile_idc (1 byte), constraint_set (1 byte), level_idc (1 byte)
  let sps = sps_list[0];
  if sps.len() < 4 {
    return None;
  }
  let profile_idc = sps[1];
  let profile_compat = sps[2];
  let level_idc = sps[3];

  // Build avcC box
  let mut result = vec![
    1,              // configurationVersion = 1
    profile_idc,    // AVCProfileIndication
    profile_compat, // profile_compatibility
    level_idc,      // AVCLevelIndication
    0xFF,           // lengthSizeMinusOne (6 bits reserved=1 + 2 bits value=3)
  ];

  // numOfSequenceParameterSets (3 bits reserved=1 + 5 bits count)
  let num_sps = (sps_list.len() as u8).min(31);
  result.push(0xE0 | num_sps);

  // Write each SPS
  for sps in sps_list.iter().take(num_sps as usize) {
    let len = sps.len() as u16;
    result.extend_from_slice(&len.to_be_bytes());
    result.extend_from_slice(sps);
  }

  // numOfPictureParameterSets
  let num_pps = pps_list.len() as u8;
  result.push(num_pps);

  // Write each PPS
  for pps in pps_list.iter().take(num_pps as usize) {
    let len = pps.len() as u16;
    result.extend_from_slice(&len.to_be_bytes());
    result.extend_from_slice(pps);
  }

  Some(result)
}

/// Extract avcC configuration record from AVCC-formatted packet data
///
/// AVCC packet format uses 4-byte length prefixes for each NAL unit.
/// This function parses the packet to find SPS and PPS NAL units,
/// then builds an avcC (AVCDecoderConfigurationRecord) from them.
///
/// This is useful for VideoToolbox which embeds SPS/PPS inline in the first key frame
/// packet instead of populating the codec context's extradata field.
pub fn extract_avcc_from_avcc_packet(data: &[u8]) -> Option<Vec<u8>> {
  if data.len() < 8 {
    return None;
  }

  // Parse AVCC-formatted NAL units (4-byte length prefix)
  let mut sps_list: Vec<Vec<u8>> = Vec::new();
  let mut pps_list: Vec<Vec<u8>> = Vec::new();
  let mut offset = 0;

  while offset + 4 <= data.len() {
    let nal_length = ((data[offset] as usize) << 24)
      | ((data[offset + 1] as usize) << 16)
      | ((data[offset + 2] as usize) << 8)
      | (data[offset + 3] as usize);

    if nal_length == 0 || offset + 4 + nal_length > data.len() {
      break;
    }

    let nal_data = &data[offset + 4..offset + 4 + nal_length];
    if !nal_data.is_empty() {
      let nal_type = nal_data[0] & 0x1F;
      match nal_type {
        7 => sps_list.push(nal_data.to_vec()), // SPS
        8 => pps_list.push(nal_data.to_vec()), // PPS
        _ => {}                                // Skip other NAL types (SEI, IDR, etc.)
      }
    }

    offset += 4 + nal_length;
  }

  // Need at least one SPS and one PPS
  if sps_list.is_empty() || pps_list.is_empty() {
    return None;
  }

  // Extract profile/level from first SPS
  // SPS structure: nal_unit_type (1 byte), profile_idc (1 byte), constraint_set (1 byte), level_idc (1 byte)
  let sps = &sps_list[0];
  if sps.len() < 4 {
    return None;
  }
  let profile_idc = sps[1];
  let profile_compat = sps[2];
  let level_idc = sps[3];

  // Build avcC box (same format as convert_annexb_extradata_to_avcc)
  let mut result = vec![
    1,              // configurationVersion = 1
    profile_idc,    // AVCProfileIndication
    profile_compat, // profile_compatibility
    level_idc,      // AVCLevelIndication
    0xFF,           // lengthSizeMinusOne = 3 (4 bytes) + reserved 6 bits set to 1
  ];

  // Number of SPS (3 reserved bits + 5 bits for count)
  let num_sps = std::cmp::min(sps_list.len(), 31) as u8;
  result.push(0xE0 | num_sps);

  // Write each SPS
  for sps in sps_list.iter().take(num_sps as usize) {
    let len = sps.len() as u16;
    result.extend_from_slice(&len.to_be_bytes());
    result.extend_from_slice(sps);
  }

  // Number of PPS (8 bits for count)
  let num_pps = std::cmp::min(pps_list.len(), 255) as u8;
  result.push(num_pps);

  // Write each PPS
  for pps in pps_list.iter().take(num_pps as usize) {
    let len = pps.len() as u16;
    result.extend_from_slice(&len.to_be_bytes());
    result.extend_from_slice(pps);
  }

  Some(result)
}

/// Extract hvcC configuration record from HVCC-formatted packet data
///
/// HVCC packet format uses 4-byte length prefixes for each NAL unit.
/// This function parses the packet to find VPS, SPS, and PPS NAL units,
/// then builds an hvcC (HEVCDecoderConfigurationRecord) from them.
///
/// This is useful for VideoToolbox which embeds VPS/SPS/PPS inline in the first key frame
/// packet instead of populating the codec context's extradata field.
pub fn extract_hvcc_from_hvcc_packet(data: &[u8]) -> Option<Vec<u8>> {
  if data.len() < 8 {
    return None;
  }

  // Parse HVCC-formatted NAL units (4-byte length prefix)
  let mut vps_list: Vec<Vec<u8>> = Vec::new();
  let mut sps_list: Vec<Vec<u8>> = Vec::new();
  let mut pps_list: Vec<Vec<u8>> = Vec::new();
  let mut offset = 0;

  while offset + 4 <= data.len() {
    let nal_length = ((data[offset] as usize) << 24)
      | ((data[offset + 1] as usize) << 16)
      | ((data[offset + 2] as usize) << 8)
      | (data[offset + 3] as usize);

    if nal_length == 0 || offset + 4 + nal_length > data.len() {
      break;
    }

    let nal_data = &data[offset + 4..offset + 4 + nal_length];
    if !nal_data.is_empty() {
      // HEVC NAL type is (byte[0] >> 1) & 0x3F
      let nal_type = (nal_data[0] >> 1) & 0x3F;
      match nal_type {
        32 => vps_list.push(nal_data.to_vec()), // VPS
        33 => sps_list.push(nal_data.to_vec()), // SPS
        34 => pps_list.push(nal_data.to_vec()), // PPS
        _ => {}                                 // Skip other NAL types
      }
    }

    offset += 4 + nal_length;
  }

  // Need at least one SPS and one PPS
  if sps_list.is_empty() || pps_list.is_empty() {
    return None;
  }

  // Build hvcC box (same format as convert_annexb_extradata_to_hvcc)
  let mut result = Vec::new();

  // configurationVersion = 1
  result.push(1);
  // general_profile_space (2 bits) + general_tier_flag (1 bit) + general_profile_idc (5 bits)
  // Default: profile_space=0, tier_flag=0, profile_idc=1 (Main)
  result.push(0x01);
  // general_profile_compatibility_flags (4 bytes)
  result.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);
  // general_constraint_indicator_flags (6 bytes)
  result.extend_from_slice(&[0x90, 0x00, 0x00, 0x00, 0x00, 0x00]);
  // general_level_idc
  result.push(0x5D); // Level 3.1 default
  // min_spatial_segmentation_idc (4 bits reserved=1 + 12 bits value)
  result.extend_from_slice(&[0xF0, 0x00]);
  // parallelismType (6 bits reserved=1 + 2 bits value)
  result.push(0xFC);
  // chromaFormat (6 bits reserved=1 + 2 bits value)
  result.push(0xFD); // 4:2:0
  // bitDepthLumaMinus8 (5 bits reserved=1 + 3 bits value)
  result.push(0xF8);
  // bitDepthChromaMinus8 (5 bits reserved=1 + 3 bits value)
  result.push(0xF8);
  // avgFrameRate (2 bytes)
  result.extend_from_slice(&[0x00, 0x00]);
  // constantFrameRate (2 bits) + numTemporalLayers (3 bits) + temporalIdNested (1 bit) + lengthSizeMinusOne (2 bits)
  result.push(0x0F); // 4-byte NALU lengths

  // numOfArrays
  let has_vps = !vps_list.is_empty();
  let num_arrays = if has_vps { 3u8 } else { 2u8 };
  result.push(num_arrays);

  // HEVC NAL unit types for parameter sets
  const VPS_NAL_TYPE: u8 = 32;
  const SPS_NAL_TYPE: u8 = 33;
  const PPS_NAL_TYPE: u8 = 34;

  // Write VPS array if present
  if has_vps {
    // array_completeness (1 bit) + reserved (1 bit) + NAL_unit_type (6 bits)
    result.push(VPS_NAL_TYPE);
    let num_vps = std::cmp::min(vps_list.len(), 255) as u16;
    result.extend_from_slice(&num_vps.to_be_bytes());
    for vps in vps_list.iter().take(num_vps as usize) {
      let len = vps.len() as u16;
      result.extend_from_slice(&len.to_be_bytes());
      result.extend_from_slice(vps);
    }
  }

  // Write SPS array
  result.push(SPS_NAL_TYPE);
  let num_sps = std::cmp::min(sps_list.len(), 255) as u16;
  result.extend_from_slice(&num_sps.to_be_bytes());
  for sps in sps_list.iter().take(num_sps as usize) {
    let len = sps.len() as u16;
    result.extend_from_slice(&len.to_be_bytes());
    result.extend_from_slice(sps);
  }

  // Write PPS array
  result.push(PPS_NAL_TYPE);
  let num_pps = std::cmp::min(pps_list.len(), 255) as u16;
  result.extend_from_slice(&num_pps.to_be_bytes());
  for pps in pps_list.iter().take(num_pps as usize) {
    let len = pps.len() as u16;
    result.extend_from_slice(&len.to_be_bytes());
    result.extend_from_slice(pps);
  }

  Some(result)
}

/// Convert H.265 Annex B extradata (VPS/SPS/PPS with start codes) to hvcC box format
///
/// hvcC format (HEVCDecoderConfigurationRecord) per ISO/IEC 14496-15
pub fn convert_annexb_extradata_to_hvcc(data: &[u8]) -> Option<Vec<u8>> {
  if data.is_empty() {
    return None;
  }

  // Parse NAL units from Annex B format
  let mut vps_list: Vec<&[u8]> = Vec::new();
  let mut sps_list: Vec<&[u8]> = Vec::new();
  let mut pps_list: Vec<&[u8]> = Vec::new();
  let mut i = 0;

  while i < data.len() {
    // Find start code (0x000001 or 0x00000001)
    let mut start_code_len = 0;
    if i + 4 <= data.len()
      && data[i] == 0
      && data[i + 1] == 0
      && data[i + 2] == 0
      && data[i + 3] == 1
    {
      start_code_len = 4;
    } else if i + 3 <= data.len() && data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
      start_code_len = 3;
    }

    if start_code_len > 0 {
      let nal_start = i + start_code_len;

      // Find end of this NAL (next start code or end of data)
      let mut nal_end = data.len();
      let mut j = nal_start;
      while j < data.len() {
        // Check for 4-byte start code (00 00 00 01) or 3-byte start code (00 00 01)
        let is_4byte_start = j + 4 <= data.len()
          && data[j] == 0
          && data[j + 1] == 0
          && data[j + 2] == 0
          && data[j + 3] == 1;
        let is_3byte_start =
          j + 3 <= data.len() && data[j] == 0 && data[j + 1] == 0 && data[j + 2] == 1;
        if is_4byte_start || is_3byte_start {
          nal_end = j;
          break;
        }
        j += 1;
      }

      if nal_start < nal_end {
        // HEVC NAL type is (byte[0] >> 1) & 0x3F
        let nal_type = (data[nal_start] >> 1) & 0x3F;
        match nal_type {
          32 => vps_list.push(&data[nal_start..nal_end]), // VPS
          33 => sps_list.push(&data[nal_start..nal_end]), // SPS
          34 => pps_list.push(&data[nal_start..nal_end]), // PPS
          _ => {}                                         // Skip other NAL types
        }
      }
      i = nal_end;
    } else {
      i += 1;
    }
  }

  // Need at least one SPS and one PPS
  if sps_list.is_empty() || pps_list.is_empty() {
    return None;
  }

  // Parse SPS to extract profile/tier/level
  // HEVC SPS structure is complex; we'll use defaults for now and copy NAL data
  let sps = sps_list[0];
  if sps.len() < 6 {
    return None;
  }

  // Build hvcC box
  let mut result = Vec::new();

  // configurationVersion = 1
  result.push(1);
  // general_profile_space (2 bits) + general_tier_flag (1 bit) + general_profile_idc (5 bits)
  // We'll set defaults: profile_space=0, tier_flag=0, profile_idc=1 (Main)
  result.push(0x01);
  // general_profile_compatibility_flags (4 bytes)
  result.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);
  // general_constraint_indicator_flags (6 bytes)
  result.extend_from_slice(&[0x90, 0x00, 0x00, 0x00, 0x00, 0x00]);
  // general_level_idc
  result.push(0x5D); // Level 3.1 default
  // min_spatial_segmentation_idc (4 bits reserved=1 + 12 bits value)
  result.extend_from_slice(&[0xF0, 0x00]);
  // parallelismType (6 bits reserved=1 + 2 bits value)
  result.push(0xFC);
  // chromaFormat (6 bits reserved=1 + 2 bits value)
  result.push(0xFD); // 4:2:0
  // bitDepthLumaMinus8 (5 bits reserved=1 + 3 bits value)
  result.push(0xF8);
  // bitDepthChromaMinus8 (5 bits reserved=1 + 3 bits value)
  result.push(0xF8);
  // avgFrameRate (2 bytes)
  result.extend_from_slice(&[0x00, 0x00]);
  // constantFrameRate (2 bits) + numTemporalLayers (3 bits) + temporalIdNested (1 bit) + lengthSizeMinusOne (2 bits)
  result.push(0x0F); // 4-byte NALU lengths

  // numOfArrays
  let has_vps = !vps_list.is_empty();
  let num_arrays = if has_vps { 3u8 } else { 2u8 };
  result.push(num_arrays);

  // HEVC NAL unit types for parameter sets
  const VPS_NAL_TYPE: u8 = 32;
  const SPS_NAL_TYPE: u8 = 33;
  const PPS_NAL_TYPE: u8 = 34;

  // Write VPS array if present
  if has_vps {
    // array_completeness (1 bit) + reserved (1 bit) + NAL_unit_type (6 bits)
    result.push(VPS_NAL_TYPE);
    let num_vps = (vps_list.len() as u16).min(255);
    result.extend_from_slice(&num_vps.to_be_bytes());
    for vps in vps_list.iter().take(num_vps as usize) {
      let len = vps.len() as u16;
      result.extend_from_slice(&len.to_be_bytes());
      result.extend_from_slice(vps);
    }
  }

  // Write SPS array
  result.push(SPS_NAL_TYPE);
  let num_sps = (sps_list.len() as u16).min(255);
  result.extend_from_slice(&num_sps.to_be_bytes());
  for sps in sps_list.iter().take(num_sps as usize) {
    let len = sps.len() as u16;
    result.extend_from_slice(&len.to_be_bytes());
    result.extend_from_slice(sps);
  }

  // Write PPS array
  result.push(PPS_NAL_TYPE);
  let num_pps = (pps_list.len() as u16).min(255);
  result.extend_from_slice(&num_pps.to_be_bytes());
  for pps in pps_list.iter().take(num_pps as usize) {
    let len = pps.len() as u16;
    result.extend_from_slice(&len.to_be_bytes());
    result.extend_from_slice(pps);
  }

  Some(result)
}

/// Convert avcC box format extradata to Annex B format (SPS/PPS with start codes)
///
/// This is the reverse of convert_annexb_extradata_to_avcc.
/// Used when decoder receives avcC format description but FFmpeg needs Annex B.
pub fn convert_avcc_extradata_to_annexb(data: &[u8]) -> Option<Vec<u8>> {
  if data.len() < 7 {
    return None;
  }

  // Check version byte - should be 1 for avcC
  if data[0] != 1 {
    // Not avcC format, might already be Annex B
    return None;
  }

  // AVCC header layout (first 6 bytes):
  // byte 0: version (1)
  // byte 1: profile
  // byte 2: compatibility
  // byte 3: level
  // byte 4: lengthSizeMinusOne (lower 2 bits) - NAL unit length prefix size, usually 4
  // byte 5: numSPS (lower 5 bits)

  // Number of SPS (bits 0-4 of byte 5)
  let num_sps = data[5] & 0x1F;

  let mut result = Vec::new();
  let mut offset = 6;

  // Read SPS NALUs
  for _ in 0..num_sps {
    if offset + 2 > data.len() {
      return None;
    }
    let sps_len = u16::from_be_bytes([data[offset], data[offset + 1]]) as usize;
    offset += 2;

    if offset + sps_len > data.len() {
      return None;
    }

    // Write start code + SPS
    result.extend_from_slice(&[0, 0, 0, 1]);
    result.extend_from_slice(&data[offset..offset + sps_len]);
    offset += sps_len;
  }

  // Number of PPS
  if offset >= data.len() {
    return None;
  }
  let num_pps = data[offset];
  offset += 1;

  // Read PPS NALUs
  for _ in 0..num_pps {
    if offset + 2 > data.len() {
      return None;
    }
    let pps_len = u16::from_be_bytes([data[offset], data[offset + 1]]) as usize;
    offset += 2;

    if offset + pps_len > data.len() {
      return None;
    }

    // Write start code + PPS
    result.extend_from_slice(&[0, 0, 0, 1]);
    result.extend_from_slice(&data[offset..offset + pps_len]);
    offset += pps_len;
  }

  Some(result)
}

/// Check if extradata looks like avcC box format (H.264)
/// Returns true if the data starts with version byte 1 (avcC signature)
pub fn is_avcc_extradata(data: &[u8]) -> bool {
  // avcC starts with configurationVersion = 1
  // Annex B starts with start code (0x000001 or 0x00000001)
  // Check minimum length for avcC (version + profile + compat + level + length + numSPS)
  data.len() >= 7 && data[0] == 1 && !(data[1] == 0 && data[2] == 0)
}

/// Check if extradata looks like hvcC box format (H.265/HEVC)
/// Returns true if the data appears to be HEVCDecoderConfigurationRecord
pub fn is_hvcc_extradata(data: &[u8]) -> bool {
  // hvcC starts with configurationVersion = 1, followed by profile/tier/level info
  // Minimum size: 23 bytes header + at least one array entry
  // Check that it's not Annex B (start code) and has the right version
  if data.len() < 23 {
    return false;
  }
  // Version should be 1
  if data[0] != 1 {
    return false;
  }
  // Check it's not Annex B
  if data[1] == 0 && data[2] == 0 {
    return false;
  }
  // Check numOfArrays at offset 22 - should be reasonable
  let num_arrays = data[22];
  num_arrays > 0 && num_arrays <= 8 // Typically 3 (VPS, SPS, PPS) or less
}

/// Convert hvcC box format extradata to Annex B format (VPS/SPS/PPS with start codes)
///
/// hvcC (HEVCDecoderConfigurationRecord) per ISO/IEC 14496-15:
/// - configurationVersion (1 byte) = 1
/// - general_profile_space/tier_flag/profile_idc (1 byte)
/// - general_profile_compatibility_flags (4 bytes)
/// - general_constraint_indicator_flags (6 bytes)
/// - general_level_idc (1 byte)
/// - min_spatial_segmentation_idc (2 bytes with 4 reserved bits)
/// - parallelismType (1 byte with 6 reserved bits)
/// - chromaFormat (1 byte with 6 reserved bits)
/// - bitDepthLumaMinus8 (1 byte with 5 reserved bits)
/// - bitDepthChromaMinus8 (1 byte with 5 reserved bits)
/// - avgFrameRate (2 bytes)
/// - constantFrameRate/numTemporalLayers/temporalIdNested/lengthSizeMinusOne (1 byte)
/// - numOfArrays (1 byte)
/// - Arrays of NAL units (VPS, SPS, PPS, etc.)
pub fn convert_hvcc_extradata_to_annexb(data: &[u8]) -> Option<Vec<u8>> {
  if data.len() < 23 {
    return None;
  }

  // Check version byte - should be 1 for hvcC
  if data[0] != 1 {
    return None;
  }

  // numOfArrays is at offset 22
  let num_arrays = data[22] as usize;
  let mut result = Vec::new();
  let mut offset = 23;

  // Read each array (VPS, SPS, PPS, etc.)
  for _ in 0..num_arrays {
    if offset + 3 > data.len() {
      return None;
    }

    // First byte: array_completeness (1 bit) + reserved (1 bit) + NAL_unit_type (6 bits)
    // We don't need the NAL type here, just skip it
    offset += 1;

    // Number of NAL units in this array (2 bytes BE)
    let num_nalus = u16::from_be_bytes([data[offset], data[offset + 1]]) as usize;
    offset += 2;

    // Read each NAL unit
    for _ in 0..num_nalus {
      if offset + 2 > data.len() {
        return None;
      }

      let nal_len = u16::from_be_bytes([data[offset], data[offset + 1]]) as usize;
      offset += 2;

      if offset + nal_len > data.len() {
        return None;
      }

      // Write start code + NAL unit
      result.extend_from_slice(&[0, 0, 0, 1]);
      result.extend_from_slice(&data[offset..offset + nal_len]);
      offset += nal_len;
    }
  }

  if result.is_empty() {
    return None;
  }

  Some(result)
}

// ============================================================================
// AV1 OBU to av1C Conversion
// ============================================================================

/// Check if extradata is already in av1C format (AV1CodecConfigurationRecord)
///
/// av1C format per ISO/IEC 14496-15 Section 4.2.3.2 starts with:
/// - marker (1 bit) = 1
/// - version (7 bits) = 1
///
/// Combined = 0x81
pub fn is_av1c_extradata(data: &[u8]) -> bool {
  // av1C starts with marker=1 (1 bit) + version=1 (7 bits) = 0x81
  // Minimum size: 4 bytes header
  data.len() >= 4 && data[0] == 0x81
}

/// Read LEB128 variable-length unsigned integer
///
/// Returns (value, bytes_consumed) or None if invalid
pub(crate) fn read_leb128(data: &[u8]) -> Option<(usize, usize)> {
  let mut value: usize = 0;
  let mut bytes_read = 0;

  for (i, &byte) in data.iter().take(8).enumerate() {
    value |= ((byte & 0x7F) as usize) << (i * 7);
    bytes_read = i + 1;
    if byte & 0x80 == 0 {
      break;
    }
  }

  if bytes_read == 0 {
    return None;
  }

  Some((value, bytes_read))
}

/// Find the sequence header OBU in raw AV1 OBU data
///
/// OBU header format:
/// - obu_forbidden_bit (1 bit): Must be 0
/// - obu_type (4 bits): OBU type
/// - obu_extension_flag (1 bit)
/// - obu_has_size_field (1 bit)
/// - obu_reserved_1bit (1 bit)
///
/// OBU_SEQUENCE_HEADER = 1
pub(crate) fn find_sequence_header_obu(data: &[u8]) -> Option<Vec<u8>> {
  let mut offset = 0;

  while offset < data.len() {
    let header = data[offset];

    // Check forbidden bit (must be 0)
    if (header & 0x80) != 0 {
      return None;
    }

    let obu_type = (header >> 3) & 0x0F;
    let has_extension = (header >> 2) & 0x01 != 0;
    let has_size = (header >> 1) & 0x01 != 0;

    let mut header_size = 1;

    // Skip extension header if present
    if has_extension {
      if offset + header_size >= data.len() {
        return None;
      }
      header_size += 1;
    }

    // Get OBU size
    let obu_size = if has_size {
      if offset + header_size >= data.len() {
        return None;
      }
      let (size, bytes_read) = read_leb128(&data[offset + header_size..])?;
      header_size += bytes_read;
      size
    } else {
      // Size not specified - assume rest of data
      data.len().saturating_sub(offset + header_size)
    };

    // Check if this is sequence header (OBU_SEQUENCE_HEADER = 1)
    if obu_type == 1 {
      let obu_start = offset;
      let obu_end = offset + header_size + obu_size;
      if obu_end <= data.len() {
        return Some(data[obu_start..obu_end].to_vec());
      }
    }

    // Move to next OBU
    let next_offset = offset.checked_add(header_size)?.checked_add(obu_size)?;
    if next_offset <= offset {
      // Prevent infinite loop
      break;
    }
    offset = next_offset;
  }

  None
}

/// Get the payload offset within a sequence header OBU
///
/// Returns the byte offset where the actual sequence header data starts
pub(crate) fn get_seq_header_payload_offset(obu_data: &[u8]) -> Option<usize> {
  if obu_data.is_empty() {
    return None;
  }

  let header = obu_data[0];
  let has_extension = (header >> 2) & 0x01 != 0;
  let has_size = (header >> 1) & 0x01 != 0;

  let mut offset = 1;

  if has_extension {
    if offset >= obu_data.len() {
      return None;
    }
    offset += 1;
  }

  if has_size {
    if offset >= obu_data.len() {
      return None;
    }
    let (_, bytes_read) = read_leb128(&obu_data[offset..])?;
    offset += bytes_read;
  }

  Some(offset)
}

/// Convert raw AV1 OBU extradata to av1C box format
///
/// av1C format (AV1CodecConfigurationRecord) per ISO/IEC 14496-15 Section 4.2.3.2:
/// ```text
/// unsigned int (1) marker = 1;
/// unsigned int (7) version = 1;
/// unsigned int (3) seq_profile;
/// unsigned int (5) seq_level_idx_0;
/// unsigned int (1) seq_tier_0;
/// unsigned int (1) high_bitdepth;
/// unsigned int (1) twelve_bit;
/// unsigned int (1) monochrome;
/// unsigned int (1) chroma_subsampling_x;
/// unsigned int (1) chroma_subsampling_y;
/// unsigned int (2) chroma_sample_position;
/// unsigned int (3) reserved = 0;
/// unsigned int (1) initial_presentation_delay_present;
/// unsigned int (4) initial_presentation_delay_minus_one OR reserved;
/// unsigned int (8)[] configOBUs;
/// ```
///
/// libaom outputs raw OBUs as extradata, but FFmpeg's WebM/MKV muxers expect av1C format.
/// rav1e outputs proper av1C format directly.
pub fn convert_obu_extradata_to_av1c(data: &[u8]) -> Option<Vec<u8>> {
  if data.is_empty() {
    return None;
  }

  // Check if already in av1C format
  if is_av1c_extradata(data) {
    return Some(data.to_vec());
  }

  // Find the sequence header OBU
  let seq_header_obu = find_sequence_header_obu(data)?;

  // Get the payload offset to parse sequence header fields
  let payload_offset = get_seq_header_payload_offset(&seq_header_obu)?;
  let payload = &seq_header_obu[payload_offset..];

  if payload.is_empty() {
    return None;
  }

  // Parse first byte of sequence header payload
  // Bit layout: seq_profile (3) | still_picture (1) | reduced_still_picture_header (1) | ...
  let first_byte = payload[0];
  let seq_profile = (first_byte >> 5) & 0x07;

  // For the av1C header, we need profile, level, tier, and color info.
  // Parsing the full sequence header is complex, so we use reasonable defaults
  // based on the profile for most common cases.
  //
  // The muxer primarily cares about:
  // 1. The profile (which we extract)
  // 2. The raw sequence header OBU (which we include)
  //
  // Level 4.0 (seq_level_idx = 8) is a safe default for most content.

  let seq_level_idx_0: u8 = 8; // Level 4.0 - common default
  let seq_tier_0: u8 = 0; // Main tier

  // Color config defaults based on profile:
  // Profile 0 (Main): 8-bit or 10-bit, 4:2:0
  // Profile 1 (High): 8-bit or 10-bit, 4:4:4
  // Profile 2 (Professional): up to 12-bit, any chroma
  let (high_bitdepth, twelve_bit, monochrome, chroma_x, chroma_y, chroma_pos): (
    u8,
    u8,
    u8,
    u8,
    u8,
    u8,
  ) = match seq_profile {
    0 => (0, 0, 0, 1, 1, 0), // Main: 8-bit, 4:2:0
    1 => (0, 0, 0, 0, 0, 0), // High: 8-bit, 4:4:4
    2 => (1, 0, 0, 1, 1, 0), // Professional: 10-bit, 4:2:0
    _ => (0, 0, 0, 1, 1, 0), // Default to Main profile settings
  };

  // Build av1C box (4 bytes header + configOBUs)
  let mut result = Vec::with_capacity(4 + seq_header_obu.len());

  // Byte 0: marker (1 bit = 1) + version (7 bits = 1) = 0x81
  result.push(0x81);

  // Byte 1: seq_profile (3 bits) + seq_level_idx_0 (5 bits)
  result.push((seq_profile << 5) | (seq_level_idx_0 & 0x1F));

  // Byte 2: seq_tier_0 (1) + high_bitdepth (1) + twelve_bit (1) + monochrome (1) +
  //         chroma_subsampling_x (1) + chroma_subsampling_y (1) + chroma_sample_position (2)
  let byte2 = (seq_tier_0 << 7)
    | (high_bitdepth << 6)
    | (twelve_bit << 5)
    | (monochrome << 4)
    | (chroma_x << 3)
    | (chroma_y << 2)
    | (chroma_pos & 0x03);
  result.push(byte2);

  // Byte 3: reserved (3 bits = 0) + initial_presentation_delay_present (1 bit = 0) +
  //         initial_presentation_delay_minus_one (4 bits = 0)
  result.push(0x00);

  // Append the raw sequence header OBU as configOBUs
  result.extend_from_slice(&seq_header_obu);

  Some(result)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn annexb_to_avcc_round_trips_single_nal() {
    let annexb = [0, 0, 0, 1, 0x67, 0xAA, 0xBB, 0xCC];
    let avcc = convert_annexb_to_avcc(&annexb);
    assert_eq!(avcc, vec![0, 0, 0, 4, 0x67, 0xAA, 0xBB, 0xCC]);
    let back = convert_avcc_to_annexb(&avcc);
    assert_eq!(back, vec![0, 0, 0, 1, 0x67, 0xAA, 0xBB, 0xCC]);
  }

  #[test]
  fn is_avcc_format_detects_annexb_start_code() {
    let annexb = [0, 0, 0, 1, 0x65, 0, 0, 0];
    assert!(!is_avcc_format(&annexb));
  }

  #[test]
  fn avcc_extradata_round_trips_to_annexb() {
    let sps = [0x67u8, 0x42, 0x00, 0x1E, 0xAA];
    let pps = [0x68u8, 0xCE, 0x3C, 0x80];
    let mut annexb = Vec::new();
    annexb.extend_from_slice(&[0, 0, 0, 1]);
    annexb.extend_from_slice(&sps);
    annexb.extend_from_slice(&[0, 0, 0, 1]);
    annexb.extend_from_slice(&pps);

    let avcc = convert_annexb_extradata_to_avcc(&annexb).expect("avcc");
    assert!(is_avcc_extradata(&avcc));
    let back = convert_avcc_extradata_to_annexb(&avcc).expect("annexb");
    assert!(back.windows(sps.len()).any(|w| w == sps));
    assert!(back.windows(pps.len()).any(|w| w == pps));
  }

  #[test]
  fn is_av1c_extradata_checks_marker_byte() {
    assert!(is_av1c_extradata(&[0x81, 0, 0, 0]));
    assert!(!is_av1c_extradata(&[0x01, 0, 0, 0]));
  }

  #[test]
  fn convert_obu_extradata_to_av1c_is_noop_when_already_av1c() {
    let data = [0x81, 0, 0, 0, 1, 2, 3];
    assert_eq!(convert_obu_extradata_to_av1c(&data), Some(data.to_vec()));
  }
}
